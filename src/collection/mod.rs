//! Locator builder.
//!
//! This module contains the LocatorBuilder type: the wiring surface that
//! collects discovered and hand-written bindings, multibind contributions and
//! factory bindings, and assembles them into a [`Locator`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::ResolutionPolicy;
use crate::discovery::{ComponentCatalog, Discovery, ScannerConfig};
use crate::error::{ConstructResult, DiError, DiResult};
use crate::factory::{factory_recipe, FactoryInterface};
use crate::inject::{constructor_recipe, Injectable};
use crate::key::{simple_name_of, Key, TypeKey};
use crate::lifetime::Lifetime;
use crate::multibind::MultibindTable;
use crate::observer::{Observers, ResolutionObserver};
use crate::provider::{Locator, ResolverContext};
use crate::registration::{instance_recipe, recipe_fn, singleton, trait_recipe_fn, Recipe, Registry};
use crate::traits::{Resolver, ResolverCore};

pub mod module_system;
pub use module_system::LocatorModule;

struct FactoryBinding {
    key: Key,
    recipe: Recipe,
}

/// Collects bindings and builds a [`Locator`].
///
/// Registration methods return `&mut Self` so calls can be chained. Later
/// registrations for the same key replace earlier ones.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{LocatorBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Repository { config: Arc<Config> }
///
/// let mut builder = LocatorBuilder::new();
/// builder
///     .instance(Config { url: "postgres://localhost".to_string() })
///     .provide_singleton::<Repository, _>(|ctx| {
///         Ok(Repository { config: ctx.get::<Config>()? })
///     });
///
/// let locator = builder.build().unwrap();
/// let repo = locator.get::<Repository>().unwrap();
/// assert_eq!(repo.config.url, "postgres://localhost");
/// ```
pub struct LocatorBuilder {
    manual: IndexMap<Key, Recipe>,
    multibind: MultibindTable,
    factories: Vec<FactoryBinding>,
    packages: Vec<String>,
    scanner_config: ScannerConfig,
    catalog: ComponentCatalog,
    discovery: Option<Box<dyn Discovery>>,
    auto_alias_unique_named: bool,
    policy: ResolutionPolicy,
    observers: Observers,
}

impl LocatorBuilder {
    /// Creates an empty builder with the default policy and scanner
    /// configuration.
    pub fn new() -> Self {
        Self {
            manual: IndexMap::new(),
            multibind: MultibindTable::new(),
            factories: Vec::new(),
            packages: Vec::new(),
            scanner_config: ScannerConfig::default(),
            catalog: ComponentCatalog::new(),
            discovery: None,
            auto_alias_unique_named: true,
            policy: ResolutionPolicy::default(),
            observers: Observers::new(),
        }
    }

    // ----- Recipes -----

    /// Binds `key` to an arbitrary recipe.
    pub fn provide_recipe(&mut self, key: Key, recipe: Recipe) -> &mut Self {
        self.manual.insert(key, recipe);
        self
    }

    /// Registers a transient recipe for `T`: the closure runs on every
    /// resolution.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_locator::{LocatorBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// struct Request { id: u32 }
    ///
    /// let mut builder = LocatorBuilder::new();
    /// builder.provide::<Request, _>(|_| Ok(Request { id: 1 }));
    /// let locator = builder.build().unwrap();
    ///
    /// let a = locator.get::<Request>().unwrap();
    /// let b = locator.get::<Request>().unwrap();
    /// assert!(!Arc::ptr_eq(&a, &b));
    /// ```
    pub fn provide<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<T> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::of::<T>(), recipe_fn(factory))
    }

    /// Transient recipe for a trait object.
    pub fn provide_trait<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::of::<T>(), trait_recipe_fn(factory))
    }

    /// Transient recipe for `T` under a qualifier.
    pub fn provide_named<T, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<T> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::named::<T>(name), recipe_fn(factory))
    }

    /// Transient recipe for a trait object under a qualifier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_locator::{LocatorBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Greeter: Send + Sync { fn greet(&self) -> &'static str; }
    /// struct English;
    /// impl Greeter for English { fn greet(&self) -> &'static str { "hello" } }
    ///
    /// let mut builder = LocatorBuilder::new();
    /// builder.provide_named_trait::<dyn Greeter, _>("en", |_| Ok(Arc::new(English)));
    /// let locator = builder.build().unwrap();
    ///
    /// assert_eq!(locator.get_named::<dyn Greeter>("en").unwrap().greet(), "hello");
    /// ```
    pub fn provide_named_trait<T, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::named::<T>(name), trait_recipe_fn(factory))
    }

    /// Registers a shared recipe for `T`: the closure runs at most once and
    /// every resolution returns the same instance.
    pub fn provide_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<T> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::of::<T>(), singleton(recipe_fn(factory)))
    }

    /// Shared recipe for a trait object.
    pub fn provide_singleton_trait<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::of::<T>(), singleton(trait_recipe_fn(factory)))
    }

    /// Binds a pre-built value.
    pub fn instance<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.provide_recipe(Key::of::<T>(), instance_recipe(Arc::new(value)))
    }

    /// Binds a pre-built value under a qualifier.
    pub fn instance_named<T: Send + Sync + 'static>(&mut self, value: T, name: &str) -> &mut Self {
        self.provide_recipe(Key::named::<T>(name), instance_recipe(Arc::new(value)))
    }

    /// Binds a pre-built trait object.
    pub fn instance_trait<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.provide_recipe(Key::of::<T>(), instance_recipe(value))
    }

    // ----- Constructable components -----

    /// Binds `T` to its [`Injectable`] constructor with a fresh instance per
    /// resolution.
    pub fn component<T: Injectable>(&mut self) -> &mut Self {
        self.component_with::<T>(Lifetime::Transient)
    }

    /// Binds `T` to its [`Injectable`] constructor, shared.
    pub fn component_singleton<T: Injectable>(&mut self) -> &mut Self {
        self.component_with::<T>(Lifetime::Singleton)
    }

    pub fn component_with<T: Injectable>(&mut self, lifetime: Lifetime) -> &mut Self {
        let recipe = constructor_recipe::<T>();
        let recipe = if lifetime.is_shared() { singleton(recipe) } else { recipe };
        self.provide_recipe(Key::of::<T>(), recipe)
    }

    /// Binds interface `I` to whatever the locator produces for `C`.
    ///
    /// `C` keeps its own binding and scope; `I` forwards to it on every
    /// resolution.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_locator::{LocatorBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Store: Send + Sync {}
    /// struct MemoryStore;
    /// impl Store for MemoryStore {}
    ///
    /// let mut builder = LocatorBuilder::new();
    /// builder
    ///     .provide_singleton::<MemoryStore, _>(|_| Ok(MemoryStore))
    ///     .bind::<dyn Store, MemoryStore, _>(|s| s as Arc<dyn Store>);
    /// let locator = builder.build().unwrap();
    ///
    /// let a = locator.get::<dyn Store>().unwrap();
    /// let b = locator.get::<dyn Store>().unwrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// ```
    pub fn bind<I, C, F>(&mut self, cast: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::of::<I>(), forwarding_recipe::<I, C, F>(cast))
    }

    /// Same as [`bind`](Self::bind) under a qualifier.
    pub fn bind_named<I, C, F>(&mut self, name: &str, cast: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        self.provide_recipe(Key::named::<I>(name), forwarding_recipe::<I, C, F>(cast))
    }

    // ----- Factories -----

    /// Synthesizes factory `F` at build time, targeting its product type.
    pub fn bind_factory<F>(&mut self) -> &mut Self
    where
        F: FactoryInterface + ?Sized,
        F::Product: Injectable,
    {
        self.bind_factory_for::<F, F::Product>()
    }

    /// Synthesizes factory `F` at build time, building `T` and converting it
    /// into the product type.
    pub fn bind_factory_for<F, T>(&mut self) -> &mut Self
    where
        F: FactoryInterface + ?Sized,
        T: Injectable + Into<F::Product>,
    {
        self.factories.push(FactoryBinding {
            key: Key::of::<F>(),
            recipe: factory_recipe::<F, T>(),
        });
        self
    }

    // ----- Multibind -----

    /// Contributes one element to the collections of `T`.
    ///
    /// Once a type has contributions, list and set dependencies on it see
    /// exactly the contributions, in registration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_locator::{LocatorBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Plugin: Send + Sync { fn id(&self) -> u8; }
    /// struct P(u8);
    /// impl Plugin for P { fn id(&self) -> u8 { self.0 } }
    ///
    /// let mut builder = LocatorBuilder::new();
    /// builder
    ///     .into_set::<dyn Plugin, _>(|_| Ok(Arc::new(P(1))))
    ///     .into_set::<dyn Plugin, _>(|_| Ok(Arc::new(P(2))));
    /// let locator = builder.build().unwrap();
    ///
    /// let ids: Vec<u8> = locator.get_all::<dyn Plugin>().unwrap().iter().map(|p| p.id()).collect();
    /// assert_eq!(ids, vec![1, 2]);
    /// ```
    pub fn into_set<T, F>(&mut self, contribution: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
    {
        self.multibind
            .add_to_set(TypeKey::of::<T>(), trait_recipe_fn(contribution));
        self
    }

    /// Shared set contribution.
    pub fn into_set_singleton<T, F>(&mut self, contribution: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
    {
        self.multibind
            .add_to_set(TypeKey::of::<T>(), singleton(trait_recipe_fn(contribution)));
        self
    }

    /// Contributes one entry to the `String`-keyed maps of `T`.
    ///
    /// A blank or already used key is rejected with
    /// [`DiError::InvalidBinding`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_locator::{LocatorBuilder, Resolver};
    /// use std::sync::Arc;
    ///
    /// let mut builder = LocatorBuilder::new();
    /// builder.into_map::<u16, _>("http", |_| Ok(Arc::new(80))).unwrap();
    /// assert!(builder.into_map::<u16, _>("http", |_| Ok(Arc::new(8080))).is_err());
    /// assert!(builder.into_map::<u16, _>("  ", |_| Ok(Arc::new(1))).is_err());
    ///
    /// let locator = builder.build().unwrap();
    /// assert_eq!(*locator.get_named_map::<u16>().unwrap()["http"], 80);
    /// ```
    pub fn into_map<T, F>(&mut self, key: &str, contribution: F) -> DiResult<&mut Self>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
    {
        self.multibind
            .add_to_map(TypeKey::of::<T>(), key, trait_recipe_fn(contribution))?;
        Ok(self)
    }

    /// Shared map contribution.
    pub fn into_map_singleton<T, F>(&mut self, key: &str, contribution: F) -> DiResult<&mut Self>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
    {
        self.multibind
            .add_to_map(TypeKey::of::<T>(), key, singleton(trait_recipe_fn(contribution)))?;
        Ok(self)
    }

    // ----- Policy -----

    /// Whether a type with exactly one qualified binding and no unqualified
    /// one gets an unqualified alias at build time. Enabled by default.
    pub fn auto_alias_unique_named(&mut self, enabled: bool) -> &mut Self {
        self.auto_alias_unique_named = enabled;
        self
    }

    pub fn policy(&mut self, policy: ResolutionPolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    pub fn unnamed_fallback(&mut self, enabled: bool) -> &mut Self {
        self.policy.unnamed_fallback = enabled;
        self
    }

    pub fn named_fallback(&mut self, enabled: bool) -> &mut Self {
        self.policy.named_fallback = enabled;
        self
    }

    pub fn report_ambiguity(&mut self, enabled: bool) -> &mut Self {
        self.policy.report_ambiguity = enabled;
        self
    }

    // ----- Discovery -----

    /// Adds base module paths to scan at build time.
    pub fn scan_packages<I, S>(&mut self, packages: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for package in packages {
            let package = package.into();
            if !self.packages.contains(&package) {
                self.packages.push(package);
            }
        }
        self
    }

    pub fn scanner_config(&mut self, config: ScannerConfig) -> &mut Self {
        self.scanner_config = config;
        self
    }

    /// Replaces the markers that designate an injectable constructor.
    pub fn inject_markers<I, S>(&mut self, markers: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scanner_config = self.scanner_config.clone().with_inject_markers(markers);
        self
    }

    /// Replaces the markers that designate a shared type.
    pub fn singleton_markers<I, S>(&mut self, markers: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scanner_config = self.scanner_config.clone().with_singleton_markers(markers);
        self
    }

    pub fn allow_implicit_no_arg(&mut self, enabled: bool) -> &mut Self {
        self.scanner_config = self.scanner_config.clone().with_allow_implicit_no_arg(enabled);
        self
    }

    /// Replaces the component catalog used to build discovered types.
    pub fn catalog(&mut self, catalog: ComponentCatalog) -> &mut Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog_mut(&mut self) -> &mut ComponentCatalog {
        &mut self.catalog
    }

    /// Uses `discovery` instead of the catalog to decide which types are
    /// bound. Every reported type must still be present in the catalog.
    pub fn discovery<D: Discovery + 'static>(&mut self, discovery: D) -> &mut Self {
        self.discovery = Some(Box::new(discovery));
        self
    }

    // ----- Modules and observers -----

    /// Lets `module` register its bindings.
    pub fn add_module<M: LocatorModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register(self)?;
        Ok(self)
    }

    /// Adds an observer notified around every keyed resolution.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_locator::{LocatorBuilder, TracingObserver};
    /// use std::sync::Arc;
    ///
    /// let mut builder = LocatorBuilder::new();
    /// builder.add_observer(Arc::new(TracingObserver::new()));
    /// let _locator = builder.build().unwrap();
    /// ```
    pub fn add_observer(&mut self, observer: Arc<dyn ResolutionObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    // ----- Build -----

    /// Assembles the locator.
    ///
    /// Discovered bindings come first and are overwritten by manual ones.
    /// Unique qualified bindings then receive unqualified aliases (unless
    /// disabled) and every bound factory is synthesized; a factory whose
    /// contract cannot be satisfied fails the build.
    pub fn build(self) -> DiResult<Locator> {
        let LocatorBuilder {
            manual,
            multibind,
            factories,
            packages,
            scanner_config,
            catalog,
            discovery,
            auto_alias_unique_named,
            policy,
            observers,
        } = self;

        let mut all: HashMap<Key, Recipe> = HashMap::new();
        if !packages.is_empty() {
            let source: &dyn Discovery = match &discovery {
                Some(d) => d.as_ref(),
                None => &catalog,
            };
            let found = source.discover(&scanner_config, &packages)?;
            register_discovered(&mut all, &manual, &catalog, found)?;
        }

        all.extend(manual);

        if auto_alias_unique_named {
            alias_unique_named(&mut all);
        }

        let locator = Locator::from_parts(Registry::from_map(all), multibind, policy, observers);

        for binding in factories {
            locator.register(binding.key.clone(), singleton(binding.recipe));
            locator.resolve_key(&binding.key)?;
        }

        tracing::debug!(
            bindings = locator.len(),
            contributions = locator.total_contributions(),
            "locator built"
        );
        Ok(locator)
    }
}

impl Default for LocatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn forwarding_recipe<I, C, F>(cast: F) -> Recipe
where
    I: ?Sized + Send + Sync + 'static,
    C: Send + Sync + 'static,
    F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
{
    trait_recipe_fn(move |ctx: &ResolverContext<'_>| -> ConstructResult<Arc<I>> {
        Ok(cast(ctx.get::<C>()?))
    })
}

fn register_discovered(
    all: &mut HashMap<Key, Recipe>,
    manual: &IndexMap<Key, Recipe>,
    catalog: &ComponentCatalog,
    found: Vec<crate::discovery::DiscoveredType>,
) -> DiResult<()> {
    let taken = |all: &HashMap<Key, Recipe>, key: &Key| all.contains_key(key) || manual.contains_key(key);

    for discovered in found {
        let Some(entry) = catalog.lookup(discovered.type_name) else {
            tracing::warn!(component = discovered.type_name, "discovered type is not in the catalog");
            return Err(DiError::InvalidBinding(format!(
                "discovered type {} cannot be built: it is not registered in the component catalog",
                discovered.type_name
            )));
        };

        let lifetime = Lifetime::from_shared(discovered.singleton);
        let recipe = entry.recipe(lifetime.is_shared());
        all.insert(Key::with_qualifier(entry.ty, None), recipe.clone());
        tracing::trace!(component = discovered.type_name, ?lifetime, "component bound");

        for interface in &discovered.interfaces {
            let Some(iface) = entry.interface(interface) else {
                tracing::warn!(
                    component = discovered.type_name,
                    interface = *interface,
                    "interface not declared in the catalog, skipped"
                );
                continue;
            };
            let view = (iface.cast)(recipe.clone());

            let unnamed = Key::with_qualifier(iface.ty, None);
            if !taken(all, &unnamed) {
                all.insert(unnamed, view.clone());
            }

            let mut name = simple_name_of(discovered.type_name).to_string();
            let mut named = Key::new(iface.ty, Some(name.as_str()));
            if taken(all, &named) {
                name = discovered.type_name.to_string();
                named = Key::new(iface.ty, Some(name.as_str()));
            }
            let mut suffix = 2;
            while taken(all, &named) {
                named = Key::new(iface.ty, Some(format!("{name}#{suffix}").as_str()));
                suffix += 1;
            }
            all.insert(named, view);
        }
    }
    Ok(())
}

/// Adds an unqualified alias for every type bound under exactly one
/// qualifier and nothing else.
fn alias_unique_named(all: &mut HashMap<Key, Recipe>) {
    let mut named_by_type: HashMap<TypeKey, Vec<Key>> = HashMap::new();
    let mut has_unnamed: HashSet<TypeKey> = HashSet::new();
    for key in all.keys() {
        if key.is_named() {
            named_by_type.entry(key.type_key()).or_default().push(key.clone());
        } else {
            has_unnamed.insert(key.type_key());
        }
    }

    for (ty, keys) in named_by_type {
        if keys.len() != 1 || has_unnamed.contains(&ty) {
            continue;
        }
        if let Some(recipe) = all.get(&keys[0]).cloned() {
            tracing::debug!(alias = %keys[0], "unqualified alias created");
            all.insert(keys[0].unnamed(), recipe);
        }
    }
}
