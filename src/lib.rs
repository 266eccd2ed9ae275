//! # ferrous-locator
//!
//! Runtime object composition for Rust: a locator that maps typed, optionally
//! qualified keys to recipes and builds object graphs from them.
//!
//! ## Features
//!
//! - **Qualified bindings**: any key may carry a name; lookups fall back
//!   between named and unnamed bindings under a configurable policy
//! - **Shared and fresh scopes**: singletons are produced exactly once, even
//!   under concurrent first access
//! - **Collections**: list, set and string-keyed map dependencies, from
//!   implicit aggregation or explicit multibind contributions
//! - **Assisted creation**: mix caller-supplied arguments with injected ones,
//!   directly or through synthesized factory traits
//! - **Member injection**: post-construction fields and methods, validated
//!   before anything is built
//! - **Cycle detection**: the full dependency path is reported
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_locator::{LocatorBuilder, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut builder = LocatorBuilder::new();
//! builder.instance(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! builder.provide::<UserService, _>(|ctx| Ok(UserService { db: ctx.get()? }));
//!
//! let locator = builder.build().unwrap();
//! let users = locator.get::<UserService>().unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Constructable types
//!
//! ```rust
//! use ferrous_locator::{Args, ConstructResult, Injectable, LocatorBuilder, Param, Resolver};
//! use std::sync::Arc;
//!
//! trait Notifier: Send + Sync {
//!     fn channel(&self) -> &'static str;
//! }
//!
//! struct Email;
//! impl Notifier for Email {
//!     fn channel(&self) -> &'static str { "email" }
//! }
//!
//! struct Alerts {
//!     notifiers: Vec<Arc<dyn Notifier>>,
//! }
//!
//! impl Injectable for Alerts {
//!     fn parameters() -> Vec<Param> {
//!         vec![Param::list::<dyn Notifier>()]
//!     }
//!
//!     fn construct(args: &mut Args) -> ConstructResult<Self> {
//!         Ok(Alerts { notifiers: args.list()? })
//!     }
//! }
//!
//! let mut builder = LocatorBuilder::new();
//! builder
//!     .provide_named_trait::<dyn Notifier, _>("email", |_| Ok(Arc::new(Email)))
//!     .component_singleton::<Alerts>();
//!
//! let locator = builder.build().unwrap();
//! let alerts = locator.get::<Alerts>().unwrap();
//! assert_eq!(alerts.notifiers.len(), 1);
//! assert_eq!(alerts.notifiers[0].channel(), "email");
//! ```
//!
//! ## Scopes
//!
//! - **Singleton**: produced on first resolution and shared afterwards
//! - **Transient**: produced fresh on every resolution

pub mod collection;
pub mod config;
pub mod descriptors;
pub mod discovery;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod provider;
pub mod traits;

mod assisted;
mod factory;
mod inject;
mod internal;
mod members;
mod multibind;
mod registration;

pub use assisted::{assisted, AssistedValue};
pub use collection::{LocatorBuilder, LocatorModule};
pub use config::ResolutionPolicy;
pub use descriptors::{AssistedParam, Dependency, Param, Shape};
pub use discovery::{ComponentCatalog, ComponentEntry, DiscoveredType, Discovery, ScannerConfig};
pub use error::{BoxError, ConstructResult, DiError, DiResult};
pub use factory::{FactoryDispatcher, FactoryInterface, FactoryParam, MethodKind, MethodSpec};
pub use inject::{constructor_recipe, Args, Injectable, InstanceSet, Resolved};
pub use key::{normalize_qualifier, Key, TypeKey};
pub use lifetime::Lifetime;
pub use members::{Member, MemberApply, MemberKind, MemberPlan};
pub use observer::{ResolutionObserver, TracingObserver};
pub use provider::{Locator, ResolverContext};
pub use registration::{recipe_fn, singleton, trait_recipe_fn, AnyArc, Recipe};
pub use traits::{Resolver, ResolverCore};

/// Re-exported for map-shaped results.
pub use indexmap::IndexMap;
