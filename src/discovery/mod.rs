//! Component discovery.
//!
//! A [`Discovery`] implementation reports which types under a set of base
//! module paths can be constructed by the locator, whether they are shared,
//! and which interfaces they implement. The builder turns each report into a
//! binding for the type plus bindings for its interfaces.
//!
//! Rust offers no runtime view of compiled types, so the stock
//! implementation, [`ComponentCatalog`], is a manifest filled in at startup.

use std::collections::BTreeSet;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::DiResult;

mod catalog;

pub use catalog::{ComponentCatalog, ComponentEntry};

/// Default marker designating an injectable constructor.
pub const DEFAULT_INJECT_MARKER: &str = "inject";
/// Default marker designating a shared (singleton) type.
pub const DEFAULT_SINGLETON_MARKER: &str = "singleton";

/// Trims a marker and strips a leading `@`.
pub fn normalize_marker(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn normalize_all<I, S>(markers: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    markers
        .into_iter()
        .filter_map(|m| normalize_marker(m.as_ref()))
        .collect()
}

/// Which markers a scan recognizes.
///
/// # Examples
///
/// ```
/// use ferrous_locator::ScannerConfig;
///
/// let config = ScannerConfig::default()
///     .with_inject_markers(["@Inject", " autowired "])
///     .with_allow_implicit_no_arg(false);
///
/// assert!(config.inject_markers().contains("Inject"));
/// assert!(config.inject_markers().contains("autowired"));
/// assert!(!config.allow_implicit_no_arg());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ScannerConfig {
    inject_markers: BTreeSet<String>,
    singleton_markers: BTreeSet<String>,
    allow_implicit_no_arg: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            inject_markers: normalize_all([DEFAULT_INJECT_MARKER]),
            singleton_markers: normalize_all([DEFAULT_SINGLETON_MARKER]),
            allow_implicit_no_arg: true,
        }
    }
}

impl ScannerConfig {
    pub fn new<I, J, S, T>(inject_markers: I, singleton_markers: J, allow_implicit_no_arg: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            inject_markers: normalize_all(inject_markers),
            singleton_markers: normalize_all(singleton_markers),
            allow_implicit_no_arg,
        }
    }

    /// Replaces the constructor markers.
    pub fn with_inject_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inject_markers = normalize_all(markers);
        self
    }

    /// Replaces the singleton markers.
    pub fn with_singleton_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.singleton_markers = normalize_all(markers);
        self
    }

    /// Whether a type with a parameterless constructor and no marker is
    /// still eligible.
    pub fn with_allow_implicit_no_arg(mut self, enabled: bool) -> Self {
        self.allow_implicit_no_arg = enabled;
        self
    }

    pub fn inject_markers(&self) -> &BTreeSet<String> {
        &self.inject_markers
    }

    pub fn singleton_markers(&self) -> &BTreeSet<String> {
        &self.singleton_markers
    }

    pub fn allow_implicit_no_arg(&self) -> bool {
        self.allow_implicit_no_arg
    }
}

/// One constructable type reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredType {
    /// Full type name as reported by `std::any::type_name`
    pub type_name: &'static str,
    /// Whether one of the configured singleton markers was found
    pub singleton: bool,
    /// Full names of the implemented interfaces, in declaration order
    pub interfaces: Vec<&'static str>,
    /// Configured constructor markers found on the type
    pub inject_markers: BTreeSet<String>,
    /// Configured singleton markers found on the type
    pub singleton_markers: BTreeSet<String>,
}

/// Source of discovered types.
pub trait Discovery: Send + Sync {
    /// Eligible types under `packages`, in registration order.
    fn discover(&self, config: &ScannerConfig, packages: &[String]) -> DiResult<Vec<DiscoveredType>>;
}

/// Whether `type_name` lives in the module `package` or below it.
pub(crate) fn in_package(type_name: &str, package: &str) -> bool {
    let package = package.trim().trim_end_matches("::");
    if package.is_empty() {
        return false;
    }
    type_name
        .strip_prefix(package)
        .is_some_and(|rest| rest.starts_with("::"))
}
