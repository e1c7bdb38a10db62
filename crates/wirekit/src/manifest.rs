//! Declarative registry manifests
//!
//! A manifest lists bindings in TOML, using the textual descriptor form:
//!
//! ```toml
//! [[binding]]
//! dependency = "IMessageSender"
//! implementation = "Email"
//! lifetime = "singleton"
//!
//! [[binding]]
//! dependency = "IInterface<>"
//! implementation = "Ex<>"
//! lifetime = "transient"
//! key = "First"
//! ```
//!
//! Types still have to be declared in the catalog; the manifest only decides
//! which implementation serves which dependency.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::TypeDescriptor;
use crate::error::{DIError, DIResult};
use crate::key::{SelectorKey, ServiceLifetime};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    pub dependency: TypeDescriptor,
    pub implementation: TypeDescriptor,
    pub lifetime: ServiceLifetime,
    #[serde(default)]
    pub key: SelectorKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    #[serde(default, rename = "binding")]
    pub bindings: Vec<BindingSpec>,
}

impl RegistryManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(input: &str) -> DIResult<Self> {
        toml::from_str(input).map_err(|e| DIError::Manifest {
            message: e.to_string(),
        })
    }

    /// Load a manifest file
    pub fn from_path(path: impl AsRef<Path>) -> DIResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let manifest = Self::from_toml_str(&content)?;
        debug!(
            "Loaded {} bindings from {}",
            manifest.bindings.len(),
            path.display()
        );
        Ok(manifest)
    }

    pub fn to_toml_string(&self) -> DIResult<String> {
        toml::to_string(self).map_err(|e| DIError::Manifest {
            message: e.to_string(),
        })
    }

    pub fn from_json_str(input: &str) -> DIResult<Self> {
        serde_json::from_str(input).map_err(|e| DIError::Manifest {
            message: e.to_string(),
        })
    }

    pub fn to_json_string(&self) -> DIResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DIError::Manifest {
            message: e.to_string(),
        })
    }

    /// Snapshot every registration of `registry`
    pub fn from_registry(registry: &Registry) -> Self {
        let bindings = registry
            .iter()
            .map(|(dependency, descriptor)| BindingSpec {
                dependency: dependency.clone(),
                implementation: descriptor.implementation().clone(),
                lifetime: descriptor.lifetime(),
                key: descriptor.key(),
            })
            .collect();
        Self { bindings }
    }

    pub fn bind(
        &mut self,
        dependency: TypeDescriptor,
        implementation: TypeDescriptor,
        lifetime: ServiceLifetime,
        key: SelectorKey,
    ) -> &mut Self {
        self.bindings.push(BindingSpec {
            dependency,
            implementation,
            lifetime,
            key,
        });
        self
    }

    /// Register every binding in order, stopping at the first rejected one.
    ///
    /// Returns the number of bindings applied.
    pub fn apply(&self, registry: &mut Registry) -> DIResult<usize> {
        for binding in &self.bindings {
            registry.register_keyed(
                binding.dependency.clone(),
                binding.implementation.clone(),
                binding.lifetime,
                binding.key,
            )?;
        }
        Ok(self.bindings.len())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
