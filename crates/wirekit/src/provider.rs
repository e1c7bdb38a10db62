//! Service modules
//!
//! A [`ServiceModule`] groups the catalog declarations and registrations of one
//! feature area. A [`ModuleSet`] collects modules and turns them into a
//! validated container.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use wirekit::{DIResult, ModuleSet, Registry, ServiceLifetime, ServiceModule, TypeCatalog};
//!
//! trait Clock: Send + Sync {}
//! struct SystemClock;
//! impl Clock for SystemClock {}
//!
//! struct ClockModule;
//!
//! impl ServiceModule for ClockModule {
//!     fn name(&self) -> &'static str {
//!         "clock"
//!     }
//!
//!     fn declare(&self, catalog: &mut TypeCatalog) {
//!         catalog.abstraction_of::<dyn Clock>();
//!         catalog
//!             .concrete_of::<SystemClock>()
//!             .implements(|clock: Arc<SystemClock>| clock as Arc<dyn Clock>)
//!             .constructor(vec![], |_| Ok(SystemClock));
//!     }
//!
//!     fn register(&self, registry: &mut Registry) -> DIResult<()> {
//!         registry.register_type::<dyn Clock, SystemClock>(ServiceLifetime::Singleton)
//!     }
//! }
//!
//! let mut modules = ModuleSet::new();
//! modules.add(ClockModule);
//! let container = modules.build().unwrap();
//! assert!(container.resolve::<dyn Clock>().is_ok());
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::TypeCatalog;
use crate::container::DIContainer;
use crate::error::DIResult;
use crate::registry::Registry;

/// A named group of type declarations and registrations
pub trait ServiceModule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower values are registered first. Default is 100.
    fn priority(&self) -> u32 {
        100
    }

    /// Declare this module's abstractions and implementations
    fn declare(&self, catalog: &mut TypeCatalog);

    /// Register this module's bindings.
    ///
    /// Called after every module has declared its types, so bindings may refer
    /// to types declared by other modules.
    fn register(&self, registry: &mut Registry) -> DIResult<()>;
}

#[derive(Default)]
pub struct ModuleSet {
    modules: Vec<Arc<dyn ServiceModule>>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: ServiceModule + 'static>(&mut self, module: M) -> &mut Self {
        self.modules.push(Arc::new(module));
        self
    }

    pub fn add_shared(&mut self, module: Arc<dyn ServiceModule>) -> &mut Self {
        self.modules.push(module);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in the order they were added
    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Registry with every module declared and registered.
    ///
    /// Modules register in ascending priority; ties keep insertion order.
    pub fn registry(&self) -> DIResult<Registry> {
        let mut catalog = TypeCatalog::new();
        for module in &self.modules {
            module.declare(&mut catalog);
        }

        let mut sorted: Vec<_> = self.modules.iter().collect();
        sorted.sort_by_key(|m| m.priority());

        info!("Registering {} service modules", sorted.len());
        let mut registry = Registry::with_catalog(catalog);
        for module in sorted {
            debug!(
                "Registering module '{}' (priority: {})",
                module.name(),
                module.priority()
            );
            module.register(&mut registry)?;
        }
        Ok(registry)
    }

    /// Validated container over every module
    pub fn build(&self) -> DIResult<DIContainer> {
        DIContainer::new(self.registry()?)
    }
}
