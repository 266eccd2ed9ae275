//! Recipe types, the scope wrapper and the provider registry.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{ReentrantMutex, RwLock};

use crate::error::{ConstructResult, DiError, DiResult};
use crate::key::{Key, TypeKey};
use crate::provider::ResolverContext;

/// Type-erased produced value. The payload is always an `Arc<T>` so that
/// concrete types and trait objects share one representation.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Zero-argument producer of a value for one key.
///
/// The context threads the resolution chain through nested lookups.
pub type Recipe = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

#[inline]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

#[inline]
pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(value: &AnyArc) -> DiResult<Arc<T>> {
    value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(DiError::TypeMismatch {
            expected: std::any::type_name::<T>(),
        })
}

#[inline]
pub(crate) fn recipe_id(recipe: &Recipe) -> *const () {
    Arc::as_ptr(recipe) as *const ()
}

/// Builds a recipe from a closure producing a `T`.
///
/// Errors returned by the closure that are not already [`DiError`]s are
/// reported as [`DiError::ConstructionFailure`].
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{recipe_fn, Key, LocatorBuilder, Resolver};
///
/// let locator = LocatorBuilder::new().build().unwrap();
/// locator.register(Key::of::<String>(), recipe_fn(|_| Ok("hi".to_string())));
/// assert_eq!(locator.get::<String>().unwrap().as_str(), "hi");
/// ```
pub fn recipe_fn<T, F>(factory: F) -> Recipe
where
    T: Send + Sync + 'static,
    F: Fn(&ResolverContext<'_>) -> ConstructResult<T> + Send + Sync + 'static,
{
    let ctor = move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
        factory(ctx)
            .map(|value| erase(Arc::new(value)))
            .map_err(|e| DiError::from_construction(std::any::type_name::<T>(), e))
    };
    Arc::new(ctor)
}

/// Builds a recipe from a closure producing an `Arc<T>`, typically a trait
/// object.
pub fn trait_recipe_fn<T, F>(factory: F) -> Recipe
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&ResolverContext<'_>) -> ConstructResult<Arc<T>> + Send + Sync + 'static,
{
    let ctor = move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
        factory(ctx)
            .map(erase)
            .map_err(|e| DiError::from_construction(std::any::type_name::<T>(), e))
    };
    Arc::new(ctor)
}

/// Recipe that always yields the same pre-built value.
pub(crate) fn instance_recipe<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Recipe {
    let stored = erase(value);
    let ctor = move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(stored.clone()) };
    Arc::new(ctor)
}

/// Wraps a recipe so its first successful result is cached and returned by
/// every later invocation.
///
/// Concurrent first invocations are serialized by a lock with a re-check
/// after acquisition, so the delegate runs at most once. A failing delegate
/// caches nothing.
pub fn singleton(delegate: Recipe) -> Recipe {
    let cell = Arc::new(SingletonCell {
        delegate,
        value: OnceCell::new(),
        init: ReentrantMutex::new(()),
    });
    let ctor = move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> { cell.get_or_produce(ctx) };
    Arc::new(ctor)
}

struct SingletonCell {
    delegate: Recipe,
    value: OnceCell<AnyArc>,
    // Reentrant so that a recipe reaching itself through an alias key ends
    // in the depth guard instead of a deadlock.
    init: ReentrantMutex<()>,
}

impl SingletonCell {
    fn get_or_produce(&self, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }

        let _guard = self.init.lock();
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }

        let produced = (self.delegate)(ctx)?;
        Ok(self.value.get_or_init(|| produced).clone())
    }
}

/// Outcome of looking for the single qualified binding of a type.
pub(crate) enum NamedLookup {
    Missing,
    Unique(Key, Recipe),
    Ambiguous(Vec<Key>),
}

/// Concurrent mapping from key to recipe.
///
/// Reads take a shared lock and clone the recipe `Arc` out, so no lock is
/// held while a recipe runs.
pub(crate) struct Registry {
    entries: RwLock<HashMap<Key, Recipe>>,
}

impl Registry {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn from_map(map: HashMap<Key, Recipe>) -> Self {
        Self {
            entries: RwLock::new(map),
        }
    }

    /// Inserts or replaces; returns the replaced recipe.
    pub(crate) fn insert(&self, key: Key, recipe: Recipe) -> Option<Recipe> {
        self.entries.write().insert(key, recipe)
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<Recipe> {
        self.entries.read().get(key).cloned()
    }

    #[inline]
    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Copies the target's current recipe reference under `alias`.
    pub(crate) fn alias(&self, alias: Key, target: &Key) -> DiResult<()> {
        let mut entries = self.entries.write();
        let recipe = entries
            .get(target)
            .cloned()
            .ok_or_else(|| DiError::not_registered(target))?;
        entries.insert(alias, recipe);
        Ok(())
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn keys(&self) -> Vec<Key> {
        self.entries.read().keys().cloned().collect()
    }

    /// Qualified bindings of `ty`, sorted by qualifier.
    pub(crate) fn named_for_type(&self, ty: TypeKey) -> Vec<(Key, Recipe)> {
        let entries = self.entries.read();
        let mut named: Vec<(Key, Recipe)> = entries
            .iter()
            .filter(|(k, _)| k.type_key() == ty && k.is_named())
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();
        named.sort_by(|a, b| a.0.qualifier().cmp(&b.0.qualifier()));
        named
    }

    pub(crate) fn unique_named(&self, ty: TypeKey) -> NamedLookup {
        let mut named = self.named_for_type(ty);
        match named.len() {
            0 => NamedLookup::Missing,
            1 => {
                let (key, recipe) = named.remove(0);
                NamedLookup::Unique(key, recipe)
            }
            _ => NamedLookup::Ambiguous(named.into_iter().map(|(k, _)| k).collect()),
        }
    }

    /// Every binding of `ty`: the unqualified one first, then qualified ones
    /// by qualifier. Entries sharing a recipe (aliases) appear once.
    pub(crate) fn bindings_for_type(&self, ty: TypeKey) -> Vec<(Key, Recipe)> {
        let unnamed_key = Key::with_qualifier(ty, None);
        let mut ordered = Vec::new();
        if let Some(recipe) = self.get(&unnamed_key) {
            ordered.push((unnamed_key, recipe));
        }
        ordered.extend(self.named_for_type(ty));

        let mut seen = HashSet::new();
        ordered.retain(|(_, recipe)| seen.insert(recipe_id(recipe)));
        ordered
    }
}
