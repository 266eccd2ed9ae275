use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{in_package, normalize_marker, DiscoveredType, Discovery, ScannerConfig};
use crate::error::DiResult;
use crate::inject::{constructor_recipe, Injectable};
use crate::key::TypeKey;
use crate::provider::ResolverContext;
use crate::registration::{erase, singleton, unerase, AnyArc, Recipe};

type MakeRecipe = Arc<dyn Fn(bool) -> Recipe + Send + Sync>;
type CastRecipe = Arc<dyn Fn(Recipe) -> Recipe + Send + Sync>;

pub(crate) struct InterfaceEntry {
    pub(crate) ty: TypeKey,
    pub(crate) cast: CastRecipe,
}

pub(crate) struct CatalogEntry {
    pub(crate) ty: TypeKey,
    constructor_markers: BTreeSet<String>,
    type_markers: BTreeSet<String>,
    no_arg: bool,
    make: MakeRecipe,
    pub(crate) interfaces: Vec<InterfaceEntry>,
}

impl CatalogEntry {
    /// Constructor recipe, wrapped in the scope wrapper when shared.
    pub(crate) fn recipe(&self, shared: bool) -> Recipe {
        (self.make)(shared)
    }

    pub(crate) fn interface(&self, name: &str) -> Option<&InterfaceEntry> {
        self.interfaces.iter().find(|i| i.ty.name() == name)
    }
}

/// Manifest of constructable components.
///
/// Each entry records a type, the markers it carries and the interfaces it
/// can be viewed as. Discovery walks entries in registration order.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{Args, ComponentCatalog, ConstructResult, Discovery, Injectable,
///     ScannerConfig};
/// use std::sync::Arc;
///
/// mod mail {
///     pub trait Mailer: Send + Sync {}
///     pub struct Smtp;
///     impl Mailer for Smtp {}
/// }
///
/// impl Injectable for mail::Smtp {
///     fn construct(_: &mut Args) -> ConstructResult<Self> {
///         Ok(mail::Smtp)
///     }
/// }
///
/// let mut catalog = ComponentCatalog::new();
/// catalog
///     .component::<mail::Smtp>()
///     .type_marker("singleton")
///     .implements::<dyn mail::Mailer, _>(|c| c as Arc<dyn mail::Mailer>);
///
/// let package = std::any::type_name::<mail::Smtp>().trim_end_matches("::Smtp").to_string();
/// let found = catalog.discover(&ScannerConfig::default(), &[package]).unwrap();
/// assert_eq!(found.len(), 1);
/// assert!(found[0].singleton);
/// assert_eq!(found[0].interfaces.len(), 1);
/// ```
#[derive(Default)]
pub struct ComponentCatalog {
    entries: Vec<CatalogEntry>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T` (or returns its existing entry) for further description.
    pub fn component<T: Injectable>(&mut self) -> ComponentEntry<'_, T> {
        let ty = TypeKey::of::<T>();
        let index = match self.entries.iter().position(|e| e.ty == ty) {
            Some(index) => index,
            None => {
                let make: MakeRecipe = Arc::new(|shared: bool| {
                    let recipe = constructor_recipe::<T>();
                    if shared {
                        singleton(recipe)
                    } else {
                        recipe
                    }
                });
                self.entries.push(CatalogEntry {
                    ty,
                    constructor_markers: BTreeSet::new(),
                    type_markers: BTreeSet::new(),
                    no_arg: T::parameters().is_empty(),
                    make,
                    interfaces: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        ComponentEntry {
            entry: &mut self.entries[index],
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn lookup(&self, type_name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.ty.name() == type_name)
    }
}

impl Discovery for ComponentCatalog {
    fn discover(&self, config: &ScannerConfig, packages: &[String]) -> DiResult<Vec<DiscoveredType>> {
        let mut found = Vec::new();
        for entry in &self.entries {
            let name = entry.ty.name();
            if !packages.iter().any(|p| in_package(name, p)) {
                continue;
            }

            let inject_markers: BTreeSet<String> = entry
                .constructor_markers
                .intersection(config.inject_markers())
                .cloned()
                .collect();
            let eligible = !inject_markers.is_empty()
                || (config.allow_implicit_no_arg() && entry.no_arg);
            if !eligible {
                tracing::trace!(component = name, "skipped: no constructor marker");
                continue;
            }

            let singleton_markers: BTreeSet<String> = entry
                .type_markers
                .intersection(config.singleton_markers())
                .cloned()
                .collect();

            found.push(DiscoveredType {
                type_name: name,
                singleton: !singleton_markers.is_empty(),
                interfaces: entry.interfaces.iter().map(|i| i.ty.name()).collect(),
                inject_markers,
                singleton_markers,
            });
        }
        tracing::debug!(packages = ?packages, found = found.len(), "catalog scanned");
        Ok(found)
    }
}

/// Builder for one catalog entry.
pub struct ComponentEntry<'a, T> {
    entry: &'a mut CatalogEntry,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Injectable> ComponentEntry<'a, T> {
    /// Marks the constructor with `marker`.
    pub fn constructor_marker(self, marker: &str) -> Self {
        if let Some(m) = normalize_marker(marker) {
            self.entry.constructor_markers.insert(m);
        }
        self
    }

    /// Marks the type itself with `marker`.
    pub fn type_marker(self, marker: &str) -> Self {
        if let Some(m) = normalize_marker(marker) {
            self.entry.type_markers.insert(m);
        }
        self
    }

    /// Declares that `T` implements interface `I`, viewed through `cast`.
    pub fn implements<I, F>(self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let ty = TypeKey::of::<I>();
        if self.entry.interfaces.iter().any(|i| i.ty == ty) {
            return self;
        }
        let cast = Arc::new(cast);
        let make: CastRecipe = Arc::new(move |component: Recipe| cast_recipe::<T, I>(component, cast.clone()));
        self.entry.interfaces.push(InterfaceEntry { ty, cast: make });
        self
    }
}

/// Recipe viewing the value of `component` as `I`.
pub(crate) fn cast_recipe<T, I>(
    component: Recipe,
    cast: Arc<dyn Fn(Arc<T>) -> Arc<I> + Send + Sync>,
) -> Recipe
where
    T: Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
{
    let ctor = move |ctx: &ResolverContext<'_>| -> crate::DiResult<AnyArc> {
        let value = unerase::<T>(&component(ctx)?)?;
        Ok(erase(cast(value)))
    };
    Arc::new(ctor)
}
