//! Resolver traits for value resolution.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptors::{Dependency, Shape};
use crate::error::{DiError, DiResult};
use crate::inject::{InstanceSet, Resolved};
use crate::key::Key;
use crate::registration::{unerase, AnyArc};

/// Object-safe resolution primitives.
///
/// Implemented by [`Locator`](crate::Locator) for top-level calls and by
/// [`ResolverContext`](crate::ResolverContext) for calls made from inside a
/// recipe, where the chain of keys under construction must be carried along.
/// Most code uses the generic [`Resolver`] methods instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves one key, applying the fallback policy and the cycle guard.
    fn resolve_key(&self, key: &Key) -> DiResult<AnyArc>;

    /// Resolves a dependency descriptor of any shape.
    fn resolve_dependency(&self, dependency: &Dependency) -> DiResult<Resolved>;

    /// Whether `key` would find a recipe under the current policy.
    fn has_key(&self, key: &Key) -> bool;
}

/// Typed resolution surface.
///
/// Every method is defined in terms of [`ResolverCore`], so `Locator` and
/// `ResolverContext` behave identically apart from cycle tracking.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{LocatorBuilder, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// struct French;
/// impl Greeter for French {
///     fn greet(&self) -> String { "bonjour".into() }
/// }
///
/// let mut builder = LocatorBuilder::new();
/// builder.provide_named_trait::<dyn Greeter, _>("en", |_| Ok(Arc::new(English)));
/// builder.provide_named_trait::<dyn Greeter, _>("fr", |_| Ok(Arc::new(French)));
/// let locator = builder.build().unwrap();
///
/// assert_eq!(locator.get_named::<dyn Greeter>("fr").unwrap().greet(), "bonjour");
///
/// let all: Vec<String> = locator
///     .get_all::<dyn Greeter>()
///     .unwrap()
///     .iter()
///     .map(|g| g.greet())
///     .collect();
/// assert_eq!(all, vec!["hello", "bonjour"]);
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the unqualified binding of `T`.
    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_key(&Key::of::<T>())?;
        unerase::<T>(&any)
    }

    /// Resolves the binding of `T` qualified by `name`.
    fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let any = self.resolve_key(&Key::named::<T>(name))?;
        unerase::<T>(&any)
    }

    /// Resolves `T`, panicking on failure.
    fn get_required<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Whether an unqualified request for `T` would find a recipe.
    fn has<T: ?Sized + 'static>(&self) -> bool {
        self.has_key(&Key::of::<T>())
    }

    /// Whether a request for `T` qualified by `name` would find a recipe.
    fn has_named<T: ?Sized + 'static>(&self, name: &str) -> bool {
        self.has_key(&Key::named::<T>(name))
    }

    /// Every value of `T`, in list order.
    ///
    /// Explicit set contributions replace the registered bindings when any
    /// exist.
    fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_dependency(&Dependency::list::<T>())?.into_list::<T>()
    }

    /// Same elements as [`get_all`](Self::get_all), identity-deduplicated.
    fn get_all_set<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<InstanceSet<T>> {
        self.resolve_dependency(&Dependency::set::<T>())?.into_set::<T>()
    }

    /// Qualified values of `T` keyed by qualifier (or explicit map keys).
    fn get_named_map<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> DiResult<IndexMap<String, Arc<T>>> {
        self.resolve_dependency(&Dependency::map::<T>())?.into_map::<T>()
    }

    /// Resolves a single-shaped dependency to a typed value.
    fn get_dependency<T: ?Sized + Send + Sync + 'static>(
        &self,
        dependency: &Dependency,
    ) -> DiResult<Arc<T>> {
        if dependency.shape() != Shape::Single {
            return Err(DiError::InvalidDescriptor(format!(
                "{dependency} is not a single-valued dependency"
            )));
        }
        self.resolve_dependency(dependency)?.into_single::<T>()
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
