//! Resolution policy configuration.
//!
//! The policy decides which fallback rules the engine applies when an exact
//! key has no binding. It can be set on the builder, loaded from the
//! environment, and toggled on a live locator.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Environment variable controlling [`ResolutionPolicy::unnamed_fallback`].
pub const ENV_UNNAMED_FALLBACK: &str = "FERROUS_LOCATOR_UNNAMED_FALLBACK";
/// Environment variable controlling [`ResolutionPolicy::named_fallback`].
pub const ENV_NAMED_FALLBACK: &str = "FERROUS_LOCATOR_NAMED_FALLBACK";
/// Environment variable controlling [`ResolutionPolicy::report_ambiguity`].
pub const ENV_REPORT_AMBIGUITY: &str = "FERROUS_LOCATOR_REPORT_AMBIGUITY";

/// Fallback rules applied by the resolution engine.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::ResolutionPolicy;
///
/// let convenient = ResolutionPolicy::default();
/// assert!(convenient.unnamed_fallback && convenient.named_fallback);
///
/// let strict = ResolutionPolicy::strict();
/// assert!(!strict.unnamed_fallback && !strict.named_fallback);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ResolutionPolicy {
    /// An unqualified request may use the only qualified binding of its type.
    pub unnamed_fallback: bool,
    /// A qualified request may use the unqualified binding of its type.
    pub named_fallback: bool,
    /// Report several qualified candidates as `AmbiguousBinding` instead of
    /// `NotRegistered`.
    pub report_ambiguity: bool,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            unnamed_fallback: true,
            named_fallback: true,
            report_ambiguity: false,
        }
    }
}

impl ResolutionPolicy {
    /// Exact matches only.
    pub fn strict() -> Self {
        Self {
            unnamed_fallback: false,
            named_fallback: false,
            report_ambiguity: false,
        }
    }

    /// Reads the policy from `FERROUS_LOCATOR_*` environment variables.
    ///
    /// Absent variables keep their default; unparsable ones are rejected.
    pub fn from_env() -> DiResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// ```rust
    /// use ferrous_locator::ResolutionPolicy;
    ///
    /// let policy = ResolutionPolicy::from_lookup(|name| match name {
    ///     "FERROUS_LOCATOR_NAMED_FALLBACK" => Some("off".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert!(policy.unnamed_fallback);
    /// assert!(!policy.named_fallback);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> DiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();
        if let Some(raw) = lookup(ENV_UNNAMED_FALLBACK) {
            policy.unnamed_fallback = parse_flag(ENV_UNNAMED_FALLBACK, &raw)?;
        }
        if let Some(raw) = lookup(ENV_NAMED_FALLBACK) {
            policy.named_fallback = parse_flag(ENV_NAMED_FALLBACK, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REPORT_AMBIGUITY) {
            policy.report_ambiguity = parse_flag(ENV_REPORT_AMBIGUITY, &raw)?;
        }
        Ok(policy)
    }
}

fn parse_flag(name: &str, raw: &str) -> DiResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DiError::InvalidConfiguration(format!(
            "{name}: expected a boolean, got '{other}'"
        ))),
    }
}

/// Live policy flags of a locator, read on every resolution.
pub(crate) struct PolicyFlags {
    unnamed_fallback: AtomicBool,
    named_fallback: AtomicBool,
    report_ambiguity: AtomicBool,
}

impl PolicyFlags {
    pub(crate) fn new(policy: ResolutionPolicy) -> Self {
        Self {
            unnamed_fallback: AtomicBool::new(policy.unnamed_fallback),
            named_fallback: AtomicBool::new(policy.named_fallback),
            report_ambiguity: AtomicBool::new(policy.report_ambiguity),
        }
    }

    pub(crate) fn snapshot(&self) -> ResolutionPolicy {
        ResolutionPolicy {
            unnamed_fallback: self.unnamed_fallback.load(Ordering::Acquire),
            named_fallback: self.named_fallback.load(Ordering::Acquire),
            report_ambiguity: self.report_ambiguity.load(Ordering::Acquire),
        }
    }

    pub(crate) fn set_unnamed_fallback(&self, enabled: bool) {
        self.unnamed_fallback.store(enabled, Ordering::Release);
    }

    pub(crate) fn set_named_fallback(&self, enabled: bool) {
        self.named_fallback.store(enabled, Ordering::Release);
    }

    pub(crate) fn set_report_ambiguity(&self, enabled: bool) {
        self.report_ambiguity.store(enabled, Ordering::Release);
    }
}
