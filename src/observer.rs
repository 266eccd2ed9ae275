//! Resolution observers.
//!
//! Observers receive a callback around every keyed resolution, which makes
//! them the hook for tracing, timing and failure reporting.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::Key;

/// Observer of keyed resolutions.
///
/// Callbacks run synchronously on the resolving thread, so implementations
/// should stay cheap. Collection lookups do not notify observers themselves;
/// each element they resolve through a key does.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{DiError, Key, LocatorBuilder, ResolutionObserver, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Counting(AtomicUsize);
///
/// impl ResolutionObserver for Counting {
///     fn resolving(&self, _key: &Key) {}
///     fn resolved(&self, _key: &Key, _duration: Duration) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
///     fn failed(&self, _key: &Key, _error: &DiError) {}
/// }
///
/// let observer = Arc::new(Counting::default());
/// let mut builder = LocatorBuilder::new();
/// builder.instance(5u8);
/// builder.add_observer(observer.clone());
/// let locator = builder.build().unwrap();
///
/// locator.get::<u8>().unwrap();
/// assert_eq!(observer.0.load(Ordering::SeqCst), 1);
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// A recipe is about to be looked up for `key`.
    fn resolving(&self, key: &Key);

    /// `key` produced a value.
    fn resolved(&self, key: &Key, duration: Duration);

    /// Resolution of `key` failed.
    fn failed(&self, key: &Key, error: &DiError);
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.failed(key, error);
        }
    }
}

/// Observer forwarding resolution events to `tracing`.
///
/// Successful resolutions are logged at `TRACE`, failures at `DEBUG`, under
/// the target `ferrous_locator::resolve` unless another one is given.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{LocatorBuilder, TracingObserver};
/// use std::sync::Arc;
///
/// let mut builder = LocatorBuilder::new();
/// builder.add_observer(Arc::new(TracingObserver::new()));
/// let _locator = builder.build().unwrap();
/// ```
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::with_label("ferrous_locator::resolve")
    }

    /// Observer tagging every event with `label`.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionObserver for TracingObserver {
    fn resolving(&self, key: &Key) {
        tracing::trace!(observer = %self.label, key = %key, "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::trace!(
            observer = %self.label,
            key = %key,
            elapsed_us = duration.as_micros() as u64,
            "resolved"
        );
    }

    fn failed(&self, key: &Key, error: &DiError) {
        tracing::debug!(observer = %self.label, key = %key, error = %error, "resolution failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl ResolutionObserver for Recording {
        fn resolving(&self, key: &Key) {
            self.0.lock().push(format!("start {key}"));
        }
        fn resolved(&self, key: &Key, _duration: Duration) {
            self.0.lock().push(format!("done {key}"));
        }
        fn failed(&self, key: &Key, _error: &DiError) {
            self.0.lock().push(format!("fail {key}"));
        }
    }

    #[test]
    fn fan_out_in_registration_order() {
        let first = Arc::new(Recording::default());
        let second = Arc::new(Recording::default());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(first.clone());
        observers.add(second.clone());

        let key = Key::named::<u8>("x");
        observers.resolving(&key);
        observers.failed(&key, &DiError::LocatorDropped);

        assert_eq!(*first.0.lock(), vec!["start u8[name=x]", "fail u8[name=x]"]);
        assert_eq!(first.0.lock().len(), second.0.lock().len());
    }
}
