//! Property-based tests for key selection, ordering and singleton sharing
mod common;

use proptest::prelude::*;
use std::sync::Arc;
use wirekit::*;

/// Implementation tagged with its registration index
struct Tagged(usize);

fn service() -> TypeDescriptor {
    TypeDescriptor::named("IService")
}

fn arb_key() -> impl Strategy<Value = SelectorKey> {
    prop_oneof![
        Just(SelectorKey::NONE),
        Just(SelectorKey::FIRST),
        Just(SelectorKey::SECOND),
    ]
}

fn arb_request_key() -> impl Strategy<Value = SelectorKey> {
    (1u8..=7).prop_map(|bits| SelectorKey::from_bits(bits).unwrap())
}

fn arb_descriptor() -> impl Strategy<Value = TypeDescriptor> {
    let leaf = "[A-Z][A-Za-z0-9_]{0,8}".prop_map(TypeDescriptor::named);
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            ("[A-Z][a-z]{0,6}", 1usize..4)
                .prop_map(|(name, arity)| TypeDescriptor::open(name, arity)),
            ("[A-Z][a-z]{0,6}", prop::collection::vec(inner.clone(), 1..4))
                .prop_map(|(name, args)| TypeDescriptor::closed(name, args)),
            inner.prop_map(TypeDescriptor::sequence_of),
        ]
    })
}

/// Container with one `Tagged(i)` implementation of `IService` per key
fn tagged_container(keys: &[SelectorKey], lifetime: ServiceLifetime) -> DIContainer {
    let mut catalog = TypeCatalog::new();
    catalog.abstraction(service());
    for index in 0..keys.len() {
        catalog
            .concrete(TypeDescriptor::named(format!("Impl{}", index)))
            .implements_named(service(), |tagged: Arc<Tagged>| tagged)
            .constructor(vec![], move |_| Ok(Tagged(index)));
    }

    let mut builder = DIContainerBuilder::new(catalog);
    for (index, key) in keys.iter().enumerate() {
        builder = builder
            .register_keyed(
                service(),
                TypeDescriptor::named(format!("Impl{}", index)),
                lifetime,
                *key,
            )
            .unwrap();
    }
    builder.build().unwrap()
}

/// Single resolution picks the newest registration whose key intersects
proptest! {
    #[test]
    fn test_newest_intersecting_key_wins(
        keys in prop::collection::vec(arb_key(), 1..12),
        request in arb_request_key(),
    ) {
        let container = tagged_container(&keys, ServiceLifetime::Transient);
        let expected = keys.iter().rposition(|key| key.intersects(request));

        let resolved = container.resolve_as::<Tagged>(&service(), request);
        match expected {
            Some(index) => {
                prop_assert_eq!(resolved.unwrap().0, index);
            }
            None => {
                let is_unresolved = matches!(resolved, Err(DIError::UnresolvedDependency { .. }));
                prop_assert!(is_unresolved);
            }
        }
    }
}

/// Sequence resolution keeps registration order and filters by key
proptest! {
    #[test]
    fn test_sequence_order_and_filter(
        keys in prop::collection::vec(arb_key(), 1..12),
        request in arb_request_key(),
    ) {
        let container = tagged_container(&keys, ServiceLifetime::Transient);
        let expected: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(_, key)| key.intersects(request))
            .map(|(index, _)| index)
            .collect();

        let sequence = container
            .resolve_type(&TypeDescriptor::sequence_of(service()), request)
            .unwrap();
        let indices: Vec<usize> = sequence
            .items()
            .unwrap()
            .iter()
            .map(|item| item.get::<Tagged>().unwrap().0)
            .collect();
        prop_assert_eq!(indices, expected);
    }
}

/// Singletons are shared between direct and sequence resolution
proptest! {
    #[test]
    fn test_singleton_identity(keys in prop::collection::vec(arb_key(), 1..8)) {
        let container = tagged_container(&keys, ServiceLifetime::Singleton);
        let sequence = container
            .resolve_type(&TypeDescriptor::sequence_of(service()), SelectorKey::ANY)
            .unwrap();
        let items = sequence.items().unwrap();
        let last = container.resolve_type(&service(), SelectorKey::ANY).unwrap();

        prop_assert!(Instance::ptr_eq(items.last().unwrap(), &last));
        prop_assert_eq!(container.singleton_count(), keys.len());
    }
}

/// Descriptor text form parses back to the same descriptor
proptest! {
    #[test]
    fn test_descriptor_text_form(descriptor in arb_descriptor()) {
        let parsed: TypeDescriptor = descriptor.to_string().parse().unwrap();
        prop_assert_eq!(parsed, descriptor);
    }
}

/// Test that singleton resolution is thread-safe
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn test_thread_safe_resolution(thread_count in 2usize..12) {
        use std::sync::mpsc;
        use std::thread;

        let (catalog, counters) = common::catalog_with_counters();
        let container = Arc::new(
            common::senders_builder(catalog).unwrap().build().unwrap(),
        );

        let (tx, rx) = mpsc::channel();
        for _ in 0..thread_count {
            let container = Arc::clone(&container);
            let tx = tx.clone();
            thread::spawn(move || {
                let senders = container
                    .resolve_all::<dyn common::MessageSender>()
                    .unwrap();
                tx.send(Arc::clone(&senders[0])).unwrap();
            });
        }

        let mut results = vec![];
        for _ in 0..thread_count {
            results.push(rx.recv().unwrap());
        }

        for result in &results[1..] {
            prop_assert!(Arc::ptr_eq(&results[0], result));
        }
        prop_assert_eq!(counters.emails(), 1);
    }
}
