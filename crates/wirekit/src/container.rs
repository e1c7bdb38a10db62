//! Resolution engine

use std::sync::Arc;

use tracing::{info, trace};

use crate::cache::{CacheKey, SingletonCache};
use crate::catalog::{Parameter, ParameterType, TypeCatalog, TypeInspector};
use crate::descriptor::TypeDescriptor;
use crate::error::{DIError, DIResult};
use crate::instance::{Arguments, Instance};
use crate::key::{SelectorKey, ServiceLifetime};
use crate::manifest::RegistryManifest;
use crate::registry::{ImplementationDescriptor, Registry};
use crate::validator;

/// The dependency injection container.
///
/// Owns a validated registry and the singleton cache. Resolution never
/// mutates the registry, so a container can be shared across threads behind
/// an `Arc`.
pub struct DIContainer {
    registry: Registry,
    singletons: SingletonCache,
}

impl DIContainer {
    /// Validate `registry` and create a container for it
    pub fn new(registry: Registry) -> DIResult<Self> {
        validator::ensure_valid(&registry)?;
        info!(
            "DI container created with {} registrations for {} dependency types",
            registry.len(),
            registry.dependency_types().count()
        );
        Ok(Self {
            registry,
            singletons: SingletonCache::new(),
        })
    }

    /// Resolve `ty` under `key`.
    ///
    /// A sequence descriptor yields an [`Instance::sequence`] with one element
    /// per matching registration of the element type, oldest first.
    pub fn resolve_type(&self, ty: &TypeDescriptor, key: SelectorKey) -> DIResult<Instance> {
        self.resolve_in(ty, key, &mut Vec::new())
    }

    /// Resolve the abstraction `T` with any key
    pub fn resolve<T: ?Sized + 'static>(&self) -> DIResult<Arc<T>> {
        self.resolve_keyed::<T>(SelectorKey::ANY)
    }

    pub fn resolve_keyed<T: ?Sized + 'static>(&self, key: SelectorKey) -> DIResult<Arc<T>> {
        self.resolve_as::<T>(&TypeDescriptor::of::<T>(), key)
    }

    /// Resolve a named or generic descriptor whose instances are `Arc<T>`
    pub fn resolve_as<T: ?Sized + 'static>(
        &self,
        ty: &TypeDescriptor,
        key: SelectorKey,
    ) -> DIResult<Arc<T>> {
        self.resolve_type(ty, key)?.downcast::<T>()
    }

    /// Every implementation registered for `T`, in registration order
    pub fn resolve_all<T: ?Sized + 'static>(&self) -> DIResult<Vec<Arc<T>>> {
        self.resolve_all_keyed::<T>(SelectorKey::ANY)
    }

    pub fn resolve_all_keyed<T: ?Sized + 'static>(
        &self,
        key: SelectorKey,
    ) -> DIResult<Vec<Arc<T>>> {
        let sequence = self.resolve_type(&TypeDescriptor::sequence::<T>(), key)?;
        let items = sequence.downcast::<Vec<Instance>>()?;
        items.iter().map(Instance::downcast::<T>).collect()
    }

    /// Check if an abstraction has registrations
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.registry.contains(&TypeDescriptor::of::<T>())
    }

    /// Number of registrations
    pub fn service_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of singletons built so far
    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn inspector(&self) -> &dyn TypeInspector {
        self.registry.inspector().as_ref()
    }

    /// `path` holds the types under construction on this call chain
    fn resolve_in(
        &self,
        ty: &TypeDescriptor,
        key: SelectorKey,
        path: &mut Vec<TypeDescriptor>,
    ) -> DIResult<Instance> {
        trace!("Resolving {} (key {})", ty, key);
        if let Some(element) = ty.element() {
            return self.resolve_sequence(element, key, path);
        }
        let descriptor = self
            .registry
            .select(ty, key)
            .ok_or_else(|| DIError::unresolved(ty, key))?;
        self.instantiate(ty, descriptor, path)
    }

    fn resolve_sequence(
        &self,
        element: &TypeDescriptor,
        key: SelectorKey,
        path: &mut Vec<TypeDescriptor>,
    ) -> DIResult<Instance> {
        let candidates = self.registry.candidates(element);
        if candidates.is_empty() {
            return Err(DIError::unresolved(
                TypeDescriptor::sequence_of(element.clone()),
                key,
            ));
        }
        let items = candidates
            .iter()
            .filter(|descriptor| descriptor.key().intersects(key))
            .map(|descriptor| self.instantiate(element, descriptor, path))
            .collect::<DIResult<Vec<_>>>()?;
        trace!("Resolved {} elements of [{}]", items.len(), element);
        Ok(Instance::sequence(items))
    }

    fn instantiate(
        &self,
        dependency: &TypeDescriptor,
        descriptor: &ImplementationDescriptor,
        path: &mut Vec<TypeDescriptor>,
    ) -> DIResult<Instance> {
        let implementation = self.registry.materialize(dependency, descriptor)?;
        match descriptor.lifetime() {
            ServiceLifetime::Transient => self.build(dependency, &implementation, path),
            ServiceLifetime::Singleton => {
                let slot = CacheKey::new(
                    dependency.clone(),
                    descriptor.key(),
                    implementation.clone(),
                );
                self.singletons
                    .get_or_create(slot, || self.build(dependency, &implementation, path))
            }
        }
    }

    /// Construct `implementation` and upcast it to `dependency`
    fn build(
        &self,
        dependency: &TypeDescriptor,
        implementation: &TypeDescriptor,
        path: &mut Vec<TypeDescriptor>,
    ) -> DIResult<Instance> {
        let instance = self.construct(implementation, path)?;
        self.inspector()
            .upcast(&instance, implementation, dependency)
            .ok_or_else(|| DIError::InvalidServiceType {
                message: format!("{} cannot be used as {}", implementation, dependency),
            })
    }

    /// Build `implementation`, failing instead of recursing when it is
    /// already under construction on this chain
    fn construct(
        &self,
        implementation: &TypeDescriptor,
        path: &mut Vec<TypeDescriptor>,
    ) -> DIResult<Instance> {
        if path.contains(implementation) {
            return Err(DIError::construction(implementation, "construction cycle"));
        }
        path.push(implementation.clone());
        let result = self.invoke_first_usable(implementation, path);
        path.pop();
        result
    }

    fn invoke_first_usable(
        &self,
        implementation: &TypeDescriptor,
        path: &mut Vec<TypeDescriptor>,
    ) -> DIResult<Instance> {
        for constructor in self.inspector().constructors(implementation) {
            if !constructor
                .parameters()
                .iter()
                .all(|parameter| self.can_resolve(parameter))
            {
                continue;
            }

            let values = constructor
                .parameters()
                .iter()
                .map(|parameter| self.resolve_parameter(parameter, path))
                .collect::<DIResult<Vec<_>>>()?;
            trace!("Constructing {} with {} arguments", implementation, values.len());
            return constructor.invoke(implementation, Arguments::new(implementation.clone(), values));
        }
        Err(DIError::construction(
            implementation,
            "no constructor with resolvable parameters",
        ))
    }

    fn can_resolve(&self, parameter: &Parameter) -> bool {
        match parameter.ty() {
            ParameterType::Dependency(ty) => match ty.element() {
                Some(element) => !self.registry.candidates(element).is_empty(),
                None if self.through_registry(ty) => {
                    self.registry.select(ty, parameter.selector()).is_some()
                }
                None => true,
            },
            ParameterType::GenericArgument { .. } => false,
        }
    }

    /// Abstractions and registered concrete types come from the registry so
    /// their lifetimes apply; other concrete types are built in place
    fn through_registry(&self, ty: &TypeDescriptor) -> bool {
        self.inspector().is_abstraction(ty) || !self.registry.candidates(ty).is_empty()
    }

    fn resolve_parameter(
        &self,
        parameter: &Parameter,
        path: &mut Vec<TypeDescriptor>,
    ) -> DIResult<Instance> {
        match parameter.ty() {
            ParameterType::Dependency(ty) if ty.is_sequence() || self.through_registry(ty) => {
                self.resolve_in(ty, parameter.selector(), path)
            }
            ParameterType::Dependency(ty) => self.construct(ty, path),
            ParameterType::GenericArgument { position, .. } => Err(DIError::construction(
                format!("generic argument {}", position),
                "argument is not bound to a type",
            )),
        }
    }
}

impl std::fmt::Debug for DIContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DIContainer")
            .field("services", &self.service_count())
            .field("singletons", &self.singleton_count())
            .finish()
    }
}

/// Builder for creating DI containers
pub struct DIContainerBuilder {
    registry: Registry,
}

impl DIContainerBuilder {
    /// Create a new builder over the types declared in `catalog`
    pub fn new(catalog: TypeCatalog) -> Self {
        Self::with_inspector(Arc::new(catalog))
    }

    pub fn with_inspector(inspector: Arc<dyn TypeInspector>) -> Self {
        Self {
            registry: Registry::new(inspector),
        }
    }

    pub fn register(
        mut self,
        dependency: TypeDescriptor,
        implementation: TypeDescriptor,
        lifetime: ServiceLifetime,
    ) -> DIResult<Self> {
        self.registry.register(dependency, implementation, lifetime)?;
        Ok(self)
    }

    pub fn register_keyed(
        mut self,
        dependency: TypeDescriptor,
        implementation: TypeDescriptor,
        lifetime: ServiceLifetime,
        key: SelectorKey,
    ) -> DIResult<Self> {
        self.registry
            .register_keyed(dependency, implementation, lifetime, key)?;
        Ok(self)
    }

    pub fn register_type<D: ?Sized + 'static, I: ?Sized + 'static>(
        mut self,
        lifetime: ServiceLifetime,
    ) -> DIResult<Self> {
        self.registry.register_type::<D, I>(lifetime)?;
        Ok(self)
    }

    pub fn register_type_keyed<D: ?Sized + 'static, I: ?Sized + 'static>(
        mut self,
        lifetime: ServiceLifetime,
        key: SelectorKey,
    ) -> DIResult<Self> {
        self.registry.register_type_keyed::<D, I>(lifetime, key)?;
        Ok(self)
    }

    /// Apply every binding of a manifest
    pub fn manifest(mut self, manifest: &RegistryManifest) -> DIResult<Self> {
        manifest.apply(&mut self.registry)?;
        Ok(self)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Build the container, validating the registry
    pub fn build(self) -> DIResult<DIContainer> {
        DIContainer::new(self.registry)
    }
}
