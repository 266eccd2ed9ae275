//! Core traits for the locator.

mod resolver;

pub use resolver::{Resolver, ResolverCore};
