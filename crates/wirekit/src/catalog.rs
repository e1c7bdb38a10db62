//! Type catalog
//!
//! Rust has no runtime reflection, so everything the container needs to know
//! about a type is declared up front in a [`TypeCatalog`]:
//!
//! - whether the type is an abstraction or a concrete implementation,
//! - the abstractions a concrete type implements, with the upcast that turns
//!   an `Arc<Impl>` into the abstraction's shape (usually `Arc<dyn Trait>`),
//! - its constructors, in declaration order, each with a parameter list and a
//!   factory closure.
//!
//! The container only talks to the catalog through the [`TypeInspector`] trait.
//!
//! ```rust
//! use std::sync::Arc;
//! use wirekit::{Parameter, TypeCatalog, TypeDescriptor};
//!
//! trait Clock: Send + Sync {}
//! struct SystemClock;
//! impl Clock for SystemClock {}
//!
//! struct Scheduler {
//!     clock: Arc<dyn Clock>,
//! }
//!
//! let mut catalog = TypeCatalog::new();
//! catalog.abstraction_of::<dyn Clock>();
//! catalog
//!     .concrete_of::<SystemClock>()
//!     .implements(|clock: Arc<SystemClock>| clock as Arc<dyn Clock>)
//!     .constructor(vec![], |_| Ok(SystemClock));
//! catalog
//!     .concrete_of::<Scheduler>()
//!     .constructor(vec![Parameter::of::<dyn Clock>()], |args| {
//!         Ok(Scheduler { clock: args.get::<dyn Clock>(0)? })
//!     });
//!
//! assert!(catalog.contains(&TypeDescriptor::of::<Scheduler>()));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::error::{DIError, DIResult};
use crate::instance::{Arguments, Instance};
use crate::key::SelectorKey;

type Factory = Arc<dyn Fn(&TypeDescriptor, &Arguments) -> DIResult<Instance> + Send + Sync>;
type Upcast = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// Runtime type introspection used by the registry, validator and engine
pub trait TypeInspector: Send + Sync {
    /// Whether `ty` must be satisfied through the registry.
    ///
    /// Sequences and types unknown to the inspector count as abstractions.
    fn is_abstraction(&self, ty: &TypeDescriptor) -> bool;

    /// Public constructors of `ty` in declaration order.
    ///
    /// For closed generics the generic parameters are already substituted.
    fn constructors(&self, ty: &TypeDescriptor) -> Vec<Constructor>;

    fn is_assignable_to(&self, implementation: &TypeDescriptor, dependency: &TypeDescriptor)
        -> bool;

    fn is_generic_open(&self, ty: &TypeDescriptor) -> bool {
        ty.is_open_generic()
    }

    /// Bind the arguments of an open generic definition
    fn substitute_generic_args(
        &self,
        ty: &TypeDescriptor,
        args: &[TypeDescriptor],
    ) -> DIResult<TypeDescriptor>;

    /// Convert an instance of `implementation` into the shape of `dependency`
    fn upcast(
        &self,
        instance: &Instance,
        implementation: &TypeDescriptor,
        dependency: &TypeDescriptor,
    ) -> Option<Instance>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Abstraction,
    Concrete,
}

/// Declared type of a constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterType {
    Dependency(TypeDescriptor),
    /// Placeholder for the `position`-th argument of a generic definition,
    /// optionally constrained to an abstraction
    GenericArgument {
        position: usize,
        constraint: Option<TypeDescriptor>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    ty: ParameterType,
    key: Option<SelectorKey>,
}

impl Parameter {
    pub fn new(ty: TypeDescriptor) -> Self {
        Self {
            ty: ParameterType::Dependency(ty),
            key: None,
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeDescriptor::of::<T>())
    }

    /// A "resolve many" parameter receiving every implementation of `T`
    pub fn sequence<T: ?Sized + 'static>() -> Self {
        Self::new(TypeDescriptor::sequence::<T>())
    }

    pub fn generic(position: usize, constraint: Option<TypeDescriptor>) -> Self {
        Self {
            ty: ParameterType::GenericArgument {
                position,
                constraint,
            },
            key: None,
        }
    }

    /// Resolve this parameter with `key` instead of `SelectorKey::ANY`
    pub fn keyed(mut self, key: SelectorKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn ty(&self) -> &ParameterType {
        &self.ty
    }

    pub fn key(&self) -> Option<SelectorKey> {
        self.key
    }

    /// Key used when resolving this parameter
    pub fn selector(&self) -> SelectorKey {
        self.key.unwrap_or(SelectorKey::ANY)
    }

    fn substitute(&self, args: &[TypeDescriptor]) -> Self {
        match &self.ty {
            ParameterType::GenericArgument { position, .. } if *position < args.len() => Self {
                ty: ParameterType::Dependency(args[*position].clone()),
                key: self.key,
            },
            _ => self.clone(),
        }
    }
}

/// A constructor handle: parameters plus the factory invoked with them
#[derive(Clone)]
pub struct Constructor {
    parameters: Vec<Parameter>,
    factory: Factory,
}

impl Constructor {
    pub fn new<F>(parameters: Vec<Parameter>, factory: F) -> Self
    where
        F: Fn(&TypeDescriptor, &Arguments) -> DIResult<Instance> + Send + Sync + 'static,
    {
        Self {
            parameters,
            factory: Arc::new(factory),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Run the factory for `ty` with already resolved arguments
    pub fn invoke(&self, ty: &TypeDescriptor, arguments: Arguments) -> DIResult<Instance> {
        if arguments.len() != self.parameters.len() {
            return Err(DIError::construction(
                ty,
                format!(
                    "constructor takes {} arguments, {} supplied",
                    self.parameters.len(),
                    arguments.len()
                ),
            ));
        }
        (self.factory)(ty, &arguments)
    }

    fn substitute(&self, args: &[TypeDescriptor]) -> Self {
        Self {
            parameters: self.parameters.iter().map(|p| p.substitute(args)).collect(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .finish()
    }
}

struct TypeInfo {
    kind: TypeKind,
    implements: HashMap<TypeDescriptor, Upcast>,
    constructors: Vec<Constructor>,
}

impl TypeInfo {
    fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            implements: HashMap::new(),
            constructors: Vec::new(),
        }
    }
}

/// Table-driven [`TypeInspector`]
#[derive(Default)]
pub struct TypeCatalog {
    types: HashMap<TypeDescriptor, TypeInfo>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an abstraction (simple or open generic)
    pub fn abstraction(&mut self, ty: TypeDescriptor) -> &mut Self {
        if let Some(key) = ty.catalog_key() {
            self.types
                .entry(key)
                .or_insert_with(|| TypeInfo::new(TypeKind::Abstraction))
                .kind = TypeKind::Abstraction;
        }
        self
    }

    pub fn abstraction_of<T: ?Sized + 'static>(&mut self) -> &mut Self {
        self.abstraction(TypeDescriptor::of::<T>())
    }

    /// Declare a concrete type (simple or open generic) and describe it
    /// through the returned entry.
    ///
    /// Sequence descriptors are not catalog types; an entry declared for one
    /// is never consulted.
    pub fn concrete(&mut self, ty: TypeDescriptor) -> TypeEntry<'_> {
        let key = ty.catalog_key().unwrap_or_else(|| ty.clone());
        let info = self
            .types
            .entry(key.clone())
            .or_insert_with(|| TypeInfo::new(TypeKind::Concrete));
        info.kind = TypeKind::Concrete;
        TypeEntry { key, info }
    }

    pub fn concrete_of<T: ?Sized + 'static>(&mut self) -> TypeEntry<'_> {
        self.concrete(TypeDescriptor::of::<T>())
    }

    pub fn contains(&self, ty: &TypeDescriptor) -> bool {
        self.info(ty).is_some()
    }

    pub fn kind(&self, ty: &TypeDescriptor) -> Option<TypeKind> {
        self.info(ty).map(|info| info.kind)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn info(&self, ty: &TypeDescriptor) -> Option<&TypeInfo> {
        ty.catalog_key().and_then(|key| self.types.get(&key))
    }

    /// Upcast declared for exactly `dependency`, else for its definition
    fn upcast_for(
        &self,
        implementation: &TypeDescriptor,
        dependency: &TypeDescriptor,
    ) -> Option<&Upcast> {
        let info = self.info(implementation)?;
        if let Some(upcast) = info.implements.get(dependency) {
            return Some(upcast);
        }
        let target = dependency.catalog_key()?;
        info.implements.get(&target)
    }

    fn implements_exactly(
        &self,
        implementation: &TypeDescriptor,
        dependency: &TypeDescriptor,
    ) -> bool {
        self.info(implementation)
            .is_some_and(|info| info.implements.contains_key(dependency))
    }
}

impl TypeInspector for TypeCatalog {
    fn is_abstraction(&self, ty: &TypeDescriptor) -> bool {
        match self.info(ty) {
            Some(info) => info.kind == TypeKind::Abstraction,
            None => true,
        }
    }

    fn constructors(&self, ty: &TypeDescriptor) -> Vec<Constructor> {
        let Some(info) = self.info(ty) else {
            return Vec::new();
        };
        match ty {
            TypeDescriptor::ClosedGeneric { args, .. } => info
                .constructors
                .iter()
                .map(|constructor| constructor.substitute(args))
                .collect(),
            _ => info.constructors.clone(),
        }
    }

    fn is_assignable_to(
        &self,
        implementation: &TypeDescriptor,
        dependency: &TypeDescriptor,
    ) -> bool {
        if implementation == dependency {
            return self.contains(implementation);
        }
        let shapes_match = match (implementation, dependency) {
            (TypeDescriptor::Simple(_), TypeDescriptor::Simple(_)) => true,
            // A plain type may specialize one closed form of a generic abstraction
            (TypeDescriptor::Simple(_), TypeDescriptor::ClosedGeneric { .. }) => {
                self.implements_exactly(implementation, dependency)
            }
            (
                TypeDescriptor::OpenGeneric { arity: a, .. },
                TypeDescriptor::OpenGeneric { arity: b, .. },
            ) => a == b,
            (
                TypeDescriptor::ClosedGeneric { args: a, .. },
                TypeDescriptor::ClosedGeneric { args: b, .. },
            ) => a == b,
            _ => false,
        };
        shapes_match && self.upcast_for(implementation, dependency).is_some()
    }

    fn substitute_generic_args(
        &self,
        ty: &TypeDescriptor,
        args: &[TypeDescriptor],
    ) -> DIResult<TypeDescriptor> {
        match ty {
            TypeDescriptor::OpenGeneric { name, arity } if *arity == args.len() => {
                Ok(TypeDescriptor::closed(name.clone(), args.to_vec()))
            }
            TypeDescriptor::OpenGeneric { arity, .. } => Err(DIError::construction(
                ty,
                format!("expected {} type arguments, got {}", arity, args.len()),
            )),
            _ => Err(DIError::construction(ty, "not an open generic definition")),
        }
    }

    fn upcast(
        &self,
        instance: &Instance,
        implementation: &TypeDescriptor,
        dependency: &TypeDescriptor,
    ) -> Option<Instance> {
        if implementation == dependency {
            return Some(instance.clone());
        }
        self.upcast_for(implementation, dependency)
            .and_then(|upcast| upcast(instance))
    }
}

/// Builder for one catalog type
pub struct TypeEntry<'a> {
    key: TypeDescriptor,
    info: &'a mut TypeInfo,
}

impl<'a> TypeEntry<'a> {
    /// Declare that this type implements the abstraction `D`
    pub fn implements<I, D, F>(self, upcast: F) -> Self
    where
        I: Send + Sync + 'static,
        D: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<I>) -> Arc<D> + Send + Sync + 'static,
    {
        self.implements_named(TypeDescriptor::of::<D>(), upcast)
    }

    /// Declare that this type implements `target`, whose instances are `Arc<D>`.
    ///
    /// A closed generic target is kept as is: the type then implements only
    /// that closed form, e.g. `RepBox: IInterface<IRep>`.
    pub fn implements_named<I, D, F>(self, target: TypeDescriptor, upcast: F) -> Self
    where
        I: Send + Sync + 'static,
        D: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<I>) -> Arc<D> + Send + Sync + 'static,
    {
        let target = if target.is_closed_generic() {
            target
        } else {
            match target.catalog_key() {
                Some(target) => target,
                None => return self,
            }
        };
        let upcast: Upcast =
            Arc::new(move |instance: &Instance| instance.get::<I>().map(|v| Instance::new(upcast(v))));
        self.info.implements.insert(target, upcast);
        self
    }

    /// Append a constructor whose factory builds a `T`
    pub fn constructor<T, F>(self, parameters: Vec<Parameter>, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> DIResult<T> + Send + Sync + 'static,
    {
        self.generic_constructor(parameters, move |_, args| build(args))
    }

    /// Append a constructor whose factory also receives the type being built,
    /// which for generic definitions carries the bound type arguments
    pub fn generic_constructor<T, F>(self, parameters: Vec<Parameter>, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&TypeDescriptor, &Arguments) -> DIResult<T> + Send + Sync + 'static,
    {
        self.info.constructors.push(Constructor::new(parameters, move |ty, args| {
            build(ty, args).map(Instance::from_value)
        }));
        self
    }

    /// Append a raw constructor
    pub fn with_constructor(self, constructor: Constructor) -> Self {
        self.info.constructors.push(constructor);
        self
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.key
    }
}
