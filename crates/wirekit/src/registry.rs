//! Service registry
//!
//! Maps each dependency type to the ordered list of implementations registered
//! for it. Entries are only ever appended; lookups that need a single
//! implementation pick the newest one whose key matches.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{TypeCatalog, TypeInspector};
use crate::descriptor::TypeDescriptor;
use crate::error::{DIError, DIResult};
use crate::key::{SelectorKey, ServiceLifetime};

/// One registration: which implementation, how long it lives, under which key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationDescriptor {
    implementation: TypeDescriptor,
    lifetime: ServiceLifetime,
    #[serde(default)]
    key: SelectorKey,
}

impl ImplementationDescriptor {
    pub fn new(implementation: TypeDescriptor, lifetime: ServiceLifetime, key: SelectorKey) -> Self {
        Self {
            implementation,
            lifetime,
            key,
        }
    }

    pub fn implementation(&self) -> &TypeDescriptor {
        &self.implementation
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    pub fn key(&self) -> SelectorKey {
        self.key
    }
}

#[derive(Clone)]
pub struct Registry {
    inspector: Arc<dyn TypeInspector>,
    entries: BTreeMap<TypeDescriptor, Vec<ImplementationDescriptor>>,
}

impl Registry {
    pub fn new(inspector: Arc<dyn TypeInspector>) -> Self {
        Self {
            inspector,
            entries: BTreeMap::new(),
        }
    }

    pub fn with_catalog(catalog: TypeCatalog) -> Self {
        Self::new(Arc::new(catalog))
    }

    /// Register `implementation` for `dependency` under `SelectorKey::NONE`
    pub fn register(
        &mut self,
        dependency: TypeDescriptor,
        implementation: TypeDescriptor,
        lifetime: ServiceLifetime,
    ) -> DIResult<()> {
        self.register_keyed(dependency, implementation, lifetime, SelectorKey::NONE)
    }

    pub fn register_keyed(
        &mut self,
        dependency: TypeDescriptor,
        implementation: TypeDescriptor,
        lifetime: ServiceLifetime,
        key: SelectorKey,
    ) -> DIResult<()> {
        if dependency.is_sequence()
            || implementation.is_sequence()
            || !self.inspector.is_assignable_to(&implementation, &dependency)
        {
            return Err(DIError::incompatible(&dependency, &implementation));
        }

        debug!(
            "Registered {} for {} ({}, key {})",
            implementation, dependency, lifetime, key
        );
        self.entries
            .entry(dependency)
            .or_default()
            .push(ImplementationDescriptor::new(implementation, lifetime, key));
        Ok(())
    }

    /// Register `I` for the abstraction `D`
    pub fn register_type<D: ?Sized + 'static, I: ?Sized + 'static>(
        &mut self,
        lifetime: ServiceLifetime,
    ) -> DIResult<()> {
        self.register_type_keyed::<D, I>(lifetime, SelectorKey::NONE)
    }

    pub fn register_type_keyed<D: ?Sized + 'static, I: ?Sized + 'static>(
        &mut self,
        lifetime: ServiceLifetime,
        key: SelectorKey,
    ) -> DIResult<()> {
        self.register_keyed(
            TypeDescriptor::of::<D>(),
            TypeDescriptor::of::<I>(),
            lifetime,
            key,
        )
    }

    pub fn contains(&self, dependency: &TypeDescriptor) -> bool {
        self.entries.contains_key(dependency)
    }

    /// Descriptors registered for `dependency`, oldest first
    pub fn descriptors(&self, dependency: &TypeDescriptor) -> &[ImplementationDescriptor] {
        self.entries
            .get(dependency)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Newest descriptor for `dependency` whose key intersects `key`
    pub fn find(
        &self,
        dependency: &TypeDescriptor,
        key: SelectorKey,
    ) -> Option<&ImplementationDescriptor> {
        self.descriptors(dependency)
            .iter()
            .rev()
            .find(|descriptor| descriptor.key.intersects(key))
    }

    /// Descriptors that can serve `dependency`.
    ///
    /// A closed generic with no registrations of its own falls back to the
    /// descriptors of its open definition.
    pub fn candidates(&self, dependency: &TypeDescriptor) -> &[ImplementationDescriptor] {
        let exact = self.descriptors(dependency);
        if !exact.is_empty() || !dependency.is_closed_generic() {
            return exact;
        }
        dependency
            .generic_definition()
            .map(|definition| self.descriptors(&definition))
            .unwrap_or(&[])
    }

    /// Descriptor serving `dependency` under `key`: the newest exact match,
    /// else the newest match on the open definition of a closed generic
    pub fn select(
        &self,
        dependency: &TypeDescriptor,
        key: SelectorKey,
    ) -> Option<&ImplementationDescriptor> {
        self.find(dependency, key).or_else(|| {
            if !dependency.is_closed_generic() {
                return None;
            }
            let definition = dependency.generic_definition()?;
            self.find(&definition, key)
        })
    }

    /// Concrete implementation type a descriptor builds for `dependency`,
    /// binding an open generic implementation to the requested arguments
    pub fn materialize(
        &self,
        dependency: &TypeDescriptor,
        descriptor: &ImplementationDescriptor,
    ) -> DIResult<TypeDescriptor> {
        let implementation = descriptor.implementation();
        if self.inspector.is_generic_open(implementation) && dependency.is_closed_generic() {
            self.inspector
                .substitute_generic_args(implementation, dependency.generic_args())
        } else {
            Ok(implementation.clone())
        }
    }

    pub fn dependency_types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.entries.keys()
    }

    /// Every (dependency, descriptor) pair in registration order per dependency
    pub fn iter(&self) -> impl Iterator<Item = (&TypeDescriptor, &ImplementationDescriptor)> {
        self.entries.iter().flat_map(|(dependency, descriptors)| {
            descriptors
                .iter()
                .map(move |descriptor| (dependency, descriptor))
        })
    }

    /// Total number of descriptors
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn inspector(&self) -> &Arc<dyn TypeInspector> {
        &self.inspector
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries)
            .finish()
    }
}
