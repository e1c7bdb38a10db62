//! Shared fixtures: message senders, a repository abstraction and a generic
//! wrapper, declared the way an application would declare them
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wirekit::*;

pub trait Rep: Send + Sync {
    fn id(&self) -> usize;
}

#[derive(Default)]
pub struct RepImpl {
    id: usize,
}

impl Rep for RepImpl {
    fn id(&self) -> usize {
        self.id
    }
}

pub trait MessageSender: Send + Sync {
    fn kind(&self) -> &'static str;
}

pub struct Email {
    pub rep: Arc<dyn Rep>,
}

impl MessageSender for Email {
    fn kind(&self) -> &'static str {
        "email"
    }
}

pub struct Letter;

impl MessageSender for Letter {
    fn kind(&self) -> &'static str {
        "letter"
    }
}

/// Receives every registered sender
pub struct Outbox {
    pub senders: Vec<Arc<dyn MessageSender>>,
}

pub trait Wrapper: Send + Sync {
    fn wrapped(&self) -> &TypeDescriptor;
    fn inner(&self) -> &Instance;
}

/// Generic implementation `Ex<T>` holding one `T`
pub struct Ex {
    closed: TypeDescriptor,
    inner: Instance,
}

impl Wrapper for Ex {
    fn wrapped(&self) -> &TypeDescriptor {
        &self.closed
    }

    fn inner(&self) -> &Instance {
        &self.inner
    }
}

/// Hand-written `IInterface<IRep>`, preferred over the generic `Ex<T>`
pub struct RepBox {
    closed: TypeDescriptor,
    inner: Instance,
}

impl Wrapper for RepBox {
    fn wrapped(&self) -> &TypeDescriptor {
        &self.closed
    }

    fn inner(&self) -> &Instance {
        &self.inner
    }
}

pub trait A: Send + Sync {}
pub trait B: Send + Sync {}

pub struct AImpl;
impl A for AImpl {}

pub struct BImpl;
impl B for BImpl {}

/// Route container logs to the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn interface() -> TypeDescriptor {
    TypeDescriptor::open("IInterface", 1)
}

pub fn interface_of_rep() -> TypeDescriptor {
    TypeDescriptor::closed("IInterface", vec![TypeDescriptor::of::<dyn Rep>()])
}

/// Construction counters shared with the catalog factories
#[derive(Default, Clone)]
pub struct Counters {
    pub reps: Arc<AtomicUsize>,
    pub emails: Arc<AtomicUsize>,
}

impl Counters {
    pub fn reps(&self) -> usize {
        self.reps.load(Ordering::SeqCst)
    }

    pub fn emails(&self) -> usize {
        self.emails.load(Ordering::SeqCst)
    }
}

pub fn catalog() -> TypeCatalog {
    catalog_with_counters().0
}

pub fn catalog_with_counters() -> (TypeCatalog, Counters) {
    let counters = Counters::default();
    let mut catalog = TypeCatalog::new();
    catalog
        .abstraction_of::<dyn Rep>()
        .abstraction_of::<dyn MessageSender>()
        .abstraction_of::<dyn A>()
        .abstraction_of::<dyn B>()
        .abstraction(interface());

    let reps = Arc::clone(&counters.reps);
    catalog
        .concrete_of::<RepImpl>()
        .implements(|rep: Arc<RepImpl>| rep as Arc<dyn Rep>)
        .constructor(vec![], move |_| {
            Ok(RepImpl {
                id: reps.fetch_add(1, Ordering::SeqCst),
            })
        });

    let emails = Arc::clone(&counters.emails);
    catalog
        .concrete_of::<Email>()
        .implements(|email: Arc<Email>| email as Arc<dyn MessageSender>)
        .constructor(vec![Parameter::of::<dyn Rep>()], move |args| {
            emails.fetch_add(1, Ordering::SeqCst);
            // Widen the race window for concurrency tests
            std::thread::sleep(std::time::Duration::from_millis(1));
            Ok(Email {
                rep: args.get::<dyn Rep>(0)?,
            })
        });

    catalog
        .concrete_of::<Letter>()
        .implements(|letter: Arc<Letter>| letter as Arc<dyn MessageSender>)
        .constructor(vec![], |_| Ok(Letter));

    catalog
        .concrete_of::<Outbox>()
        .constructor(vec![Parameter::sequence::<dyn MessageSender>()], |args| {
            Ok(Outbox {
                senders: args.all::<dyn MessageSender>(0)?,
            })
        });

    catalog
        .concrete(TypeDescriptor::open("Ex", 1))
        .implements_named(interface(), |ex: Arc<Ex>| ex as Arc<dyn Wrapper>)
        .generic_constructor(
            vec![Parameter::generic(0, Some(TypeDescriptor::of::<dyn Rep>()))],
            |closed, args| {
                Ok(Ex {
                    closed: closed.clone(),
                    inner: args.instance(0)?.clone(),
                })
            },
        );

    catalog
        .concrete_of::<RepBox>()
        .implements_named(interface_of_rep(), |boxed: Arc<RepBox>| {
            boxed as Arc<dyn Wrapper>
        })
        .constructor(vec![Parameter::of::<dyn Rep>()], |args| {
            Ok(RepBox {
                closed: interface_of_rep(),
                inner: args.instance(0)?.clone(),
            })
        });

    catalog
        .concrete_of::<AImpl>()
        .implements(|a: Arc<AImpl>| a as Arc<dyn A>)
        .constructor(vec![Parameter::of::<dyn B>()], |_| Ok(AImpl));
    catalog
        .concrete_of::<BImpl>()
        .implements(|b: Arc<BImpl>| b as Arc<dyn B>)
        .constructor(vec![Parameter::of::<dyn A>()], |_| Ok(BImpl));

    (catalog, counters)
}

/// Email (singleton) then Letter (transient) under `MessageSender`, plus a
/// transient repository
pub fn senders_builder(catalog: TypeCatalog) -> DIResult<DIContainerBuilder> {
    DIContainerBuilder::new(catalog)
        .register_type::<dyn Rep, RepImpl>(ServiceLifetime::Transient)?
        .register_type::<dyn MessageSender, Email>(ServiceLifetime::Singleton)?
        .register_type::<dyn MessageSender, Letter>(ServiceLifetime::Transient)
}
