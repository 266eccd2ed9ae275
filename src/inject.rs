//! Constructable types and the constructor recipe.
//!
//! A type opts into locator-driven construction by implementing
//! [`Injectable`]: it declares its constructor parameters once and builds
//! itself from the values the locator gathers for them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptors::{AssistedParam, Param};
use crate::error::{ConstructResult, DiError, DiResult};
use crate::members::MemberPlan;
use crate::provider::ResolverContext;
use crate::registration::{erase, unerase, AnyArc, Recipe};
use crate::traits::ResolverCore;

/// Erased value of one resolved dependency.
#[derive(Clone)]
pub enum Resolved {
    Single(AnyArc),
    List(Vec<AnyArc>),
    Set(Vec<AnyArc>),
    Map(Vec<(String, AnyArc)>),
}

impl Resolved {
    fn kind(&self) -> &'static str {
        match self {
            Resolved::Single(_) => "single value",
            Resolved::List(_) => "list",
            Resolved::Set(_) => "set",
            Resolved::Map(_) => "map",
        }
    }

    pub fn into_single<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<Arc<T>> {
        match self {
            Resolved::Single(any) => unerase::<T>(&any),
            other => Err(shape_mismatch::<T>("single value", other.kind())),
        }
    }

    /// Elements of a list (or set) dependency in resolution order.
    pub fn into_list<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<Vec<Arc<T>>> {
        match self {
            Resolved::List(items) | Resolved::Set(items) => {
                items.iter().map(unerase::<T>).collect()
            }
            other => Err(shape_mismatch::<T>("list", other.kind())),
        }
    }

    pub fn into_set<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<InstanceSet<T>> {
        match self {
            Resolved::List(items) | Resolved::Set(items) => {
                let mut set = InstanceSet::new();
                for item in &items {
                    set.insert(unerase::<T>(item)?);
                }
                Ok(set)
            }
            other => Err(shape_mismatch::<T>("set", other.kind())),
        }
    }

    pub fn into_map<T: ?Sized + Send + Sync + 'static>(
        self,
    ) -> DiResult<IndexMap<String, Arc<T>>> {
        match self {
            Resolved::Map(entries) => entries
                .into_iter()
                .map(|(name, any)| Ok((name, unerase::<T>(&any)?)))
                .collect(),
            other => Err(shape_mismatch::<T>("map", other.kind())),
        }
    }
}

fn shape_mismatch<T: ?Sized>(wanted: &str, got: &str) -> DiError {
    DiError::InvalidDescriptor(format!(
        "expected a {wanted} of {}, dependency resolved to a {got}",
        std::any::type_name::<T>()
    ))
}

/// Identity-deduplicated collection of shared instances, in insertion order.
///
/// Two entries are the same when they point at the same allocation.
///
/// # Examples
///
/// ```
/// use ferrous_locator::InstanceSet;
/// use std::sync::Arc;
///
/// let a = Arc::new(1u8);
/// let mut set = InstanceSet::new();
/// assert!(set.insert(a.clone()));
/// assert!(!set.insert(a.clone()));
/// assert!(set.insert(Arc::new(1u8)));
/// assert_eq!(set.len(), 2);
/// assert!(set.contains(&a));
/// ```
pub struct InstanceSet<T: ?Sized> {
    items: Vec<Arc<T>>,
}

impl<T: ?Sized> InstanceSet<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Adds `item` unless the same instance is already present.
    pub fn insert(&mut self, item: Arc<T>) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &Arc<T>) -> bool {
        let ptr = Arc::as_ptr(item) as *const ();
        self.items.iter().any(|i| Arc::as_ptr(i) as *const () == ptr)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Arc<T>> {
        self.items
    }
}

impl<T: ?Sized> Default for InstanceSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for InstanceSet<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: ?Sized> IntoIterator for InstanceSet<T> {
    type Item = Arc<T>;
    type IntoIter = std::vec::IntoIter<Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: ?Sized> IntoIterator for &'a InstanceSet<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: ?Sized> fmt::Debug for InstanceSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceSet")
            .field("len", &self.items.len())
            .finish()
    }
}

enum Slot {
    Resolved(Resolved),
    Assisted(Box<dyn Any + Send>),
    Taken,
}

/// Values gathered for a constructor or member, in declaration order.
///
/// Each accessor takes the next value; the accessor must match the kind of
/// the corresponding declared parameter.
pub struct Args {
    owner: &'static str,
    slots: Vec<Slot>,
    cursor: usize,
}

impl Args {
    pub(crate) fn new(owner: &'static str) -> Self {
        Self {
            owner,
            slots: Vec::new(),
            cursor: 0,
        }
    }

    pub(crate) fn push_resolved(&mut self, value: Resolved) {
        self.slots.push(Slot::Resolved(value));
    }

    pub(crate) fn push_assisted(&mut self, value: Box<dyn Any + Send>) {
        self.slots.push(Slot::Assisted(value));
    }

    /// Values not yet taken.
    pub fn remaining(&self) -> usize {
        self.slots.len().saturating_sub(self.cursor)
    }

    fn next_slot(&mut self) -> DiResult<(usize, Slot)> {
        let index = self.cursor;
        let declared = self.slots.len();
        let owner = self.owner;
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            DiError::InvalidDescriptor(format!(
                "{owner} asked for argument #{index} but only {declared} were declared"
            ))
        })?;
        self.cursor += 1;
        Ok((index, std::mem::replace(slot, Slot::Taken)))
    }

    fn next_resolved(&mut self) -> DiResult<Resolved> {
        match self.next_slot()? {
            (_, Slot::Resolved(value)) => Ok(value),
            (index, _) => Err(DiError::InvalidDescriptor(format!(
                "argument #{index} of {} is assisted, not injected",
                self.owner
            ))),
        }
    }

    /// Next single-valued dependency.
    pub fn inject<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
        self.next_resolved()?.into_single::<T>()
    }

    /// Next list dependency.
    pub fn list<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Vec<Arc<T>>> {
        self.next_resolved()?.into_list::<T>()
    }

    /// Next set dependency.
    pub fn set<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<InstanceSet<T>> {
        self.next_resolved()?.into_set::<T>()
    }

    /// Next `String`-keyed map dependency.
    pub fn map<T: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> DiResult<IndexMap<String, Arc<T>>> {
        self.next_resolved()?.into_map::<T>()
    }

    /// Next caller-supplied value.
    pub fn assisted<V: Send + 'static>(&mut self) -> DiResult<V> {
        match self.next_slot()? {
            (_, Slot::Assisted(value)) => value
                .downcast::<V>()
                .map(|boxed| *boxed)
                .map_err(|_| DiError::TypeMismatch {
                    expected: std::any::type_name::<V>(),
                }),
            (index, _) => Err(DiError::InvalidDescriptor(format!(
                "argument #{index} of {} is injected, not assisted",
                self.owner
            ))),
        }
    }
}

/// A type the locator can construct.
///
/// `parameters` is read once when a recipe is built; `construct` receives
/// the gathered values in the same order. Members declared by `members` are
/// injected after construction.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{Args, ConstructResult, Injectable, LocatorBuilder, Param, Resolver};
/// use std::sync::Arc;
///
/// struct Config { url: String }
///
/// struct Repository { config: Arc<Config> }
///
/// impl Injectable for Repository {
///     fn parameters() -> Vec<Param> {
///         vec![Param::inject::<Config>()]
///     }
///
///     fn construct(args: &mut Args) -> ConstructResult<Self> {
///         Ok(Repository { config: args.inject()? })
///     }
/// }
///
/// let mut builder = LocatorBuilder::new();
/// builder.instance(Config { url: "mem://".into() });
/// builder.component_singleton::<Repository>();
/// let locator = builder.build().unwrap();
///
/// let repo = locator.get::<Repository>().unwrap();
/// assert_eq!(repo.config.url, "mem://");
/// assert!(Arc::ptr_eq(&repo, &locator.get::<Repository>().unwrap()));
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Declared constructor parameters.
    fn parameters() -> Vec<Param> {
        Vec::new()
    }

    /// Builds the value from the gathered arguments.
    fn construct(args: &mut Args) -> ConstructResult<Self>;

    /// Fields and methods to inject after construction.
    fn members() -> MemberPlan<Self> {
        MemberPlan::new()
    }
}

/// Parameters and members of an `Injectable`, captured once.
pub(crate) struct Blueprint<T: Injectable> {
    params: Vec<Param>,
    members: MemberPlan<T>,
}

impl<T: Injectable> Blueprint<T> {
    pub(crate) fn of() -> Self {
        Self {
            params: T::parameters(),
            members: T::members(),
        }
    }

    pub(crate) fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn has_assisted(&self) -> bool {
        self.params.iter().any(Param::is_assisted)
    }

    /// Validates members, gathers arguments, constructs and injects members.
    ///
    /// `assisted` supplies the value of the `n`th parameter when it is
    /// assisted.
    pub(crate) fn instantiate<F>(&self, resolver: &dyn ResolverCore, mut assisted: F) -> DiResult<T>
    where
        F: FnMut(usize, &AssistedParam) -> DiResult<Box<dyn Any + Send>>,
    {
        let type_name = std::any::type_name::<T>();
        self.members.validate()?;

        let mut args = Args::new(type_name);
        for (index, param) in self.params.iter().enumerate() {
            match param {
                Param::Inject(dep) => args.push_resolved(resolver.resolve_dependency(dep)?),
                Param::Assisted(spec) => args.push_assisted(assisted(index, spec)?),
            }
        }

        let mut value =
            T::construct(&mut args).map_err(|e| DiError::from_construction(type_name, e))?;
        self.members.apply(&mut value, resolver)?;
        Ok(value)
    }
}

/// Recipe constructing `T` through its [`Injectable`] implementation.
///
/// A type with assisted parameters gets a recipe that always fails with
/// [`DiError::AssistedRequired`]; such types are built with
/// [`Locator::create`](crate::Locator::create) or through a factory.
pub fn constructor_recipe<T: Injectable>() -> Recipe {
    let blueprint = Blueprint::<T>::of();
    if blueprint.has_assisted() {
        let ctor = |_: &ResolverContext<'_>| -> DiResult<AnyArc> {
            Err(DiError::AssistedRequired {
                type_name: std::any::type_name::<T>(),
            })
        };
        return Arc::new(ctor);
    }

    let ctor = move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
        let value = blueprint.instantiate(ctx, |index, spec| {
            Err(DiError::AssistedArgumentMismatch(format!(
                "parameter #{index} ({spec}) has no caller value"
            )))
        })?;
        Ok(erase(Arc::new(value)))
    };
    Arc::new(ctor)
}
