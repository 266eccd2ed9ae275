//! The locator: registry lookup, fallback rules and recipe invocation.
//!
//! This module contains the Locator type and the resolution algorithm that
//! every typed accessor funnels into.

use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::RwLock;

use crate::config::{PolicyFlags, ResolutionPolicy};
use crate::descriptors::{Dependency, Shape};
use crate::error::{DiError, DiResult};
use crate::inject::Resolved;
use crate::internal::circular;
use crate::internal::{Frame, ResolutionChain};
use crate::key::{Key, TypeKey};
use crate::multibind::MultibindTable;
use crate::observer::Observers;
use crate::registration::{recipe_id, AnyArc, NamedLookup, Recipe, Registry};
use crate::traits::ResolverCore;

pub mod context;
pub use context::ResolverContext;

/// Resolves keys and dependency descriptors into values.
///
/// A `Locator` is produced by [`LocatorBuilder::build`](crate::LocatorBuilder::build)
/// and is cheap to clone; clones share the same registry. Resolution is
/// synchronous and safe from any number of threads.
///
/// Lookup for a key proceeds as follows:
///
/// 1. an exact registry match;
/// 2. for an unqualified key, the only qualified binding of the same type
///    (when the unnamed fallback is enabled);
/// 3. for a qualified key, the unqualified binding of the same type (when
///    the named fallback is enabled);
/// 4. otherwise [`DiError::NotRegistered`].
///
/// # Examples
///
/// ```
/// use ferrous_locator::{LocatorBuilder, Resolver};
///
/// let mut builder = LocatorBuilder::new();
/// builder
///     .auto_alias_unique_named(false)
///     .instance_named("primary".to_string(), "db");
/// let locator = builder.build().unwrap();
///
/// // The only qualified String answers the unqualified request.
/// assert_eq!(locator.get::<String>().unwrap().as_str(), "primary");
///
/// locator.set_unnamed_fallback(false);
/// assert!(locator.get::<String>().is_err());
/// ```
#[derive(Clone)]
pub struct Locator {
    inner: Arc<LocatorInner>,
}

pub(crate) struct LocatorInner {
    registry: Registry,
    multibind: RwLock<MultibindTable>,
    policy: PolicyFlags,
    observers: Observers,
}

impl Locator {
    pub(crate) fn from_parts(
        registry: Registry,
        multibind: MultibindTable,
        policy: ResolutionPolicy,
        observers: Observers,
    ) -> Self {
        Self {
            inner: Arc::new(LocatorInner {
                registry,
                multibind: RwLock::new(multibind),
                policy: PolicyFlags::new(policy),
                observers,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<LocatorInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(handle: &Weak<LocatorInner>) -> DiResult<Self> {
        handle
            .upgrade()
            .map(|inner| Self { inner })
            .ok_or(DiError::LocatorDropped)
    }

    // ----- registration -----

    /// Binds `recipe` under `key`, replacing any previous binding.
    pub fn register(&self, key: Key, recipe: Recipe) {
        if self.inner.registry.insert(key.clone(), recipe).is_some() {
            tracing::debug!(key = %key, "binding replaced");
        }
    }

    /// Replaces the binding for `key`.
    ///
    /// Same effect as [`register`](Self::register); use it where the intent
    /// is to swap out an existing binding, for example in tests.
    pub fn override_binding(&self, key: Key, recipe: Recipe) {
        let replaced = self.inner.registry.insert(key.clone(), recipe).is_some();
        tracing::debug!(key = %key, replaced, "binding overridden");
    }

    /// Binds `alias` to the recipe currently registered for `target`.
    ///
    /// Later changes to `target` do not affect the alias.
    pub fn alias(&self, alias: Key, target: &Key) -> DiResult<()> {
        self.inner.registry.alias(alias.clone(), target)?;
        tracing::debug!(alias = %alias, target = %target, "alias registered");
        Ok(())
    }

    /// Removes every binding and multibind contribution.
    pub fn clear(&self) {
        self.inner.registry.clear();
        self.inner.multibind.write().clear();
        tracing::debug!("locator cleared");
    }

    /// Snapshot of the registered keys, in no particular order.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.registry.keys()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit set plus map contributions registered for `T`.
    pub fn contribution_count<T: ?Sized + 'static>(&self) -> usize {
        let ty = TypeKey::of::<T>();
        let table = self.inner.multibind.read();
        table.set_count(ty) + table.map_count(ty)
    }

    pub(crate) fn total_contributions(&self) -> usize {
        self.inner.multibind.read().total()
    }

    // ----- policy -----

    /// Current policy snapshot.
    pub fn policy(&self) -> ResolutionPolicy {
        self.inner.policy.snapshot()
    }

    pub fn set_unnamed_fallback(&self, enabled: bool) {
        self.inner.policy.set_unnamed_fallback(enabled);
    }

    pub fn set_named_fallback(&self, enabled: bool) {
        self.inner.policy.set_named_fallback(enabled);
    }

    pub fn set_report_ambiguity(&self, enabled: bool) {
        self.inner.policy.set_report_ambiguity(enabled);
    }

    // ----- lookup -----

    fn find_recipe(&self, key: &Key) -> DiResult<Recipe> {
        let registry = &self.inner.registry;
        if let Some(recipe) = registry.get(key) {
            return Ok(recipe);
        }

        let policy = self.inner.policy.snapshot();
        if !key.is_named() {
            if policy.unnamed_fallback {
                match registry.unique_named(key.type_key()) {
                    NamedLookup::Unique(found, recipe) => {
                        tracing::debug!(key = %key, using = %found, "unnamed fallback");
                        return Ok(recipe);
                    }
                    NamedLookup::Ambiguous(candidates) if policy.report_ambiguity => {
                        return Err(DiError::AmbiguousBinding {
                            key: key.to_string(),
                            candidates: candidates.iter().map(Key::to_string).collect(),
                        });
                    }
                    _ => {}
                }
            }
        } else if policy.named_fallback {
            let unnamed = key.unnamed();
            if let Some(recipe) = registry.get(&unnamed) {
                tracing::debug!(key = %key, using = %unnamed, "named fallback");
                return Ok(recipe);
            }
        }

        Err(DiError::not_registered(key))
    }

    pub(crate) fn has_key(&self, key: &Key) -> bool {
        let registry = &self.inner.registry;
        if registry.contains_key(key) {
            return true;
        }
        let policy = self.inner.policy.snapshot();
        if key.is_named() {
            policy.named_fallback && registry.contains_key(&key.unnamed())
        } else {
            policy.unnamed_fallback
                && matches!(registry.unique_named(key.type_key()), NamedLookup::Unique(..))
        }
    }

    // ----- resolution -----

    pub(crate) fn resolve_in(&self, key: &Key, chain: &ResolutionChain<'_>) -> DiResult<AnyArc> {
        self.observed(key, || {
            let recipe = self.find_recipe(key)?;
            self.invoke(key, &recipe, chain)
        })
    }

    /// Runs `recipe` as the producer of `key` one level below `chain`.
    fn invoke(&self, key: &Key, recipe: &Recipe, chain: &ResolutionChain<'_>) -> DiResult<AnyArc> {
        let frame = Frame::Key(key.clone());
        let below = chain.enter(&frame)?;
        tracing::trace!(key = %key, depth = below.depth(), "invoking recipe");
        circular::track(self.id(), &frame, || {
            recipe(&ResolverContext::new(self, &below))
        })
    }

    /// Runs `f` on a chain continuing whatever this locator is producing on
    /// the current thread, so re-entrant calls from inside a recipe still
    /// see the frames above them.
    pub(crate) fn with_chain<R>(&self, f: impl FnOnce(&ResolutionChain<'_>) -> R) -> R {
        let inherited = circular::active_frames(self.id());
        f(&ResolutionChain::resumed(&inherited))
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn observed<F>(&self, key: &Key, produce: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        let observers = &self.inner.observers;
        if !observers.has_observers() {
            return produce();
        }

        let start = Instant::now();
        observers.resolving(key);
        let result = produce();
        match &result {
            Ok(_) => observers.resolved(key, start.elapsed()),
            Err(err) => observers.failed(key, err),
        }
        result
    }

    pub(crate) fn resolve_dependency_in(
        &self,
        dependency: &Dependency,
        chain: &ResolutionChain<'_>,
    ) -> DiResult<Resolved> {
        match dependency.shape() {
            Shape::Single => self
                .resolve_in(&dependency.element_key(), chain)
                .map(Resolved::Single),
            Shape::List => self.collect_elements(dependency, chain).map(Resolved::List),
            Shape::Set => self.collect_elements(dependency, chain).map(Resolved::Set),
            Shape::Map { key } => {
                if key != TypeKey::of::<String>() {
                    return Err(DiError::InvalidDescriptor(format!(
                        "map injection only supports String keys, got {dependency}"
                    )));
                }
                self.collect_map(dependency, chain).map(Resolved::Map)
            }
        }
    }

    /// Elements of a list or set dependency.
    fn collect_elements(
        &self,
        dependency: &Dependency,
        chain: &ResolutionChain<'_>,
    ) -> DiResult<Vec<AnyArc>> {
        if dependency.qualifier().is_some() {
            return Ok(vec![self.resolve_in(&dependency.element_key(), chain)?]);
        }

        let element = dependency.element();
        let contributions = self.inner.multibind.read().set_contributions(element);
        if !contributions.is_empty() {
            let frame = Frame::Contributions { element, map: false };
            let below = chain.enter(&frame)?;
            let ctx = ResolverContext::new(self, &below);
            return circular::track(self.id(), &frame, || -> DiResult<Vec<AnyArc>> {
                contributions.iter().map(|recipe| recipe(&ctx)).collect()
            });
        }

        self.inner
            .registry
            .bindings_for_type(element)
            .iter()
            .map(|(key, recipe)| self.observed(key, || self.invoke(key, recipe, chain)))
            .collect()
    }

    /// Entries of a map dependency, keyed by qualifier or contribution key.
    fn collect_map(
        &self,
        dependency: &Dependency,
        chain: &ResolutionChain<'_>,
    ) -> DiResult<Vec<(String, AnyArc)>> {
        if let Some(qualifier) = dependency.qualifier() {
            let value = self.resolve_in(&dependency.element_key(), chain)?;
            return Ok(vec![(qualifier.to_string(), value)]);
        }

        let element = dependency.element();
        let contributions = self.inner.multibind.read().map_contributions(element);
        if !contributions.is_empty() {
            let frame = Frame::Contributions { element, map: true };
            let below = chain.enter(&frame)?;
            let ctx = ResolverContext::new(self, &below);
            return circular::track(self.id(), &frame, || -> DiResult<Vec<(String, AnyArc)>> {
                contributions
                    .iter()
                    .map(|(name, recipe)| Ok((name.clone(), recipe(&ctx)?)))
                    .collect()
            });
        }

        self.inner
            .registry
            .named_for_type(element)
            .iter()
            .map(|(key, recipe)| {
                let value = self.observed(key, || self.invoke(key, recipe, chain))?;
                Ok((key.qualifier().unwrap_or_default().to_string(), value))
            })
            .collect()
    }

    /// Whether two keys currently share the same recipe.
    pub fn same_binding(&self, a: &Key, b: &Key) -> bool {
        match (self.inner.registry.get(a), self.inner.registry.get(b)) {
            (Some(x), Some(y)) => recipe_id(&x) == recipe_id(&y),
            _ => false,
        }
    }
}

impl ResolverCore for Locator {
    fn resolve_key(&self, key: &Key) -> DiResult<AnyArc> {
        self.with_chain(|chain| self.resolve_in(key, chain))
    }

    fn resolve_dependency(&self, dependency: &Dependency) -> DiResult<Resolved> {
        self.with_chain(|chain| self.resolve_dependency_in(dependency, chain))
    }

    fn has_key(&self, key: &Key) -> bool {
        Locator::has_key(self, key)
    }
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("bindings", &self.len())
            .field("contributions", &self.total_contributions())
            .field("policy", &self.policy())
            .finish()
    }
}
