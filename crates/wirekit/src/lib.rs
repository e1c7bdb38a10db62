//! Inversion-of-control container
//!
//! `wirekit` builds object graphs from a declarative registry that maps
//! abstractions to implementations. Every constructor dependency is resolved
//! recursively, with a lifetime policy (transient or singleton) and an optional
//! selector key per registration.
//!
//! Rust has no runtime reflection, so types are declared up front in a
//! [`TypeCatalog`]: which traits are abstractions, which structs implement
//! them, and how each struct is constructed.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use wirekit::{DIContainerBuilder, Parameter, ServiceLifetime, TypeCatalog};
//!
//! trait Repository: Send + Sync {
//!     fn name(&self) -> &str;
//! }
//!
//! struct MemoryRepository;
//!
//! impl Repository for MemoryRepository {
//!     fn name(&self) -> &str {
//!         "memory"
//!     }
//! }
//!
//! trait MessageSender: Send + Sync {
//!     fn send(&self) -> String;
//! }
//!
//! struct Email {
//!     repository: Arc<dyn Repository>,
//! }
//!
//! impl MessageSender for Email {
//!     fn send(&self) -> String {
//!         format!("email via {}", self.repository.name())
//!     }
//! }
//!
//! let mut catalog = TypeCatalog::new();
//! catalog
//!     .abstraction_of::<dyn Repository>()
//!     .abstraction_of::<dyn MessageSender>();
//! catalog
//!     .concrete_of::<MemoryRepository>()
//!     .implements(|r: Arc<MemoryRepository>| r as Arc<dyn Repository>)
//!     .constructor(vec![], |_| Ok(MemoryRepository));
//! catalog
//!     .concrete_of::<Email>()
//!     .implements(|e: Arc<Email>| e as Arc<dyn MessageSender>)
//!     .constructor(vec![Parameter::of::<dyn Repository>()], |args| {
//!         Ok(Email { repository: args.get::<dyn Repository>(0)? })
//!     });
//!
//! let container = DIContainerBuilder::new(catalog)
//!     .register_type::<dyn Repository, MemoryRepository>(ServiceLifetime::Singleton)
//!     .unwrap()
//!     .register_type::<dyn MessageSender, Email>(ServiceLifetime::Transient)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let sender = container.resolve::<dyn MessageSender>().unwrap();
//! assert_eq!(sender.send(), "email via memory");
//! ```
//!
//! See [`manifest`] for loading registrations from TOML and [`provider`] for
//! grouping them into modules.

pub mod cache;
pub mod catalog;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod instance;
pub mod key;
pub mod manifest;
pub mod provider;
pub mod registry;
pub mod validator;

pub use cache::{CacheKey, SingletonCache};
pub use catalog::{
    Constructor, Parameter, ParameterType, TypeCatalog, TypeEntry, TypeInspector, TypeKind,
};
pub use container::{DIContainer, DIContainerBuilder};
pub use descriptor::TypeDescriptor;
pub use error::{DIError, DIResult};
pub use instance::{Arguments, Instance};
pub use key::{SelectorKey, ServiceLifetime};
pub use manifest::{BindingSpec, RegistryManifest};
pub use provider::{ModuleSet, ServiceModule};
pub use registry::{ImplementationDescriptor, Registry};
pub use validator::{ensure_valid, validate};
