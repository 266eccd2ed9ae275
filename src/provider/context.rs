//! Resolver context for recipes.
//!
//! This module contains the ResolverContext type which recipes use to
//! resolve their own dependencies.

use crate::descriptors::Dependency;
use crate::error::DiResult;
use crate::inject::Resolved;
use crate::internal::ResolutionChain;
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

use super::Locator;

/// Context passed to recipes for resolving dependencies.
///
/// The context carries the chain of keys currently being produced, so a
/// recipe that asks for a key already on the chain fails with
/// [`DiError::Circular`](crate::DiError::Circular) instead of recursing.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{LocatorBuilder, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut builder = LocatorBuilder::new();
/// builder.instance(Database { url: "postgres://localhost".to_string() });
/// builder.provide::<UserService, _>(|ctx| {
///     Ok(UserService { db: ctx.get::<Database>()? })
/// });
///
/// let locator = builder.build().unwrap();
/// assert_eq!(locator.get::<UserService>().unwrap().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    locator: &'a Locator,
    chain: &'a ResolutionChain<'a>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(locator: &'a Locator, chain: &'a ResolutionChain<'a>) -> Self {
        Self { locator, chain }
    }

    pub(crate) fn locator(&self) -> &'a Locator {
        self.locator
    }

    pub(crate) fn chain(&self) -> &'a ResolutionChain<'a> {
        self.chain
    }

    /// Number of keys currently under construction above this recipe.
    pub fn depth(&self) -> usize {
        self.chain.depth()
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve_key(&self, key: &Key) -> DiResult<AnyArc> {
        self.locator.resolve_in(key, self.chain)
    }

    fn resolve_dependency(&self, dependency: &Dependency) -> DiResult<Resolved> {
        self.locator.resolve_dependency_in(dependency, self.chain)
    }

    fn has_key(&self, key: &Key) -> bool {
        self.locator.has_key(key)
    }
}
