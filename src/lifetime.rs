//! Binding scope definitions.

/// Scope of a binding, controlling whether its recipe result is cached.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{LocatorBuilder, Resolver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// struct Connection(u32);
///
/// let counter = Arc::new(AtomicU32::new(0));
/// let c = counter.clone();
///
/// let mut builder = LocatorBuilder::new();
/// builder.provide_singleton::<Connection, _>(move |_| {
///     Ok(Connection(c.fetch_add(1, Ordering::SeqCst)))
/// });
/// builder.provide::<u64, _>(|_| Ok(7));
/// let locator = builder.build().unwrap();
///
/// let a = locator.get::<Connection>().unwrap();
/// let b = locator.get::<Connection>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let x = locator.get::<u64>().unwrap();
/// let y = locator.get::<u64>().unwrap();
/// assert!(!Arc::ptr_eq(&x, &y));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Produced once and shared for the remainder of the locator's lifetime
    ///
    /// Concurrent first resolutions are arbitrated so that exactly one
    /// underlying recipe invocation happens and all callers observe the same
    /// instance.
    Singleton,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    pub fn is_shared(self) -> bool {
        matches!(self, Lifetime::Singleton)
    }

    pub(crate) fn from_shared(shared: bool) -> Self {
        if shared {
            Lifetime::Singleton
        } else {
            Lifetime::Transient
        }
    }
}
