//! Error types for the locator.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by construction code (recipes, `Injectable::construct`,
/// member apply closures).
///
/// Any error can be returned with `?`; a [`DiError`] travelling through this
/// box is recovered unchanged by the engine, everything else is reported as
/// [`DiError::ConstructionFailure`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type of construction code.
pub type ConstructResult<T> = Result<T, BoxError>;

/// Locator errors
///
/// Represents the failure conditions of registration, resolution, assisted
/// creation and factory synthesis.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{DiError, LocatorBuilder, Resolver};
///
/// let locator = LocatorBuilder::new().build().unwrap();
/// match locator.get::<String>() {
///     Err(DiError::NotRegistered { key }) => {
///         assert_eq!(key, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No recipe found for the key after fallback rules were applied
    #[error("No provider registered for {key}")]
    NotRegistered { key: String },

    /// Unqualified lookup matched several qualified bindings
    /// (only raised when the policy reports ambiguity)
    #[error("Ambiguous binding for {key}: candidates {}", .candidates.join(", "))]
    AmbiguousBinding { key: String, candidates: Vec<String> },

    /// A key was requested while already being produced on the same chain
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    Circular { path: Vec<String> },

    /// Resolution chain grew beyond the supported depth
    #[error("Max resolution depth {0} exceeded")]
    DepthExceeded(usize),

    /// The construction step itself failed
    #[error("Failed to construct {type_name}: {source}")]
    ConstructionFailure {
        type_name: &'static str,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// A marked member cannot receive injection
    #[error("Cannot inject into {member} of {type_name}: {reason}")]
    InvalidMemberTarget {
        type_name: &'static str,
        member: String,
        reason: &'static str,
    },

    /// Factory interface or its parameter mapping is unusable
    #[error("Factory contract violation: {0}")]
    FactoryContractViolation(String),

    /// Caller-supplied values do not line up with assisted parameters
    #[error("Assisted argument mismatch: {0}")]
    AssistedArgumentMismatch(String),

    /// Plain resolution of a type whose constructor has assisted parameters
    #[error("{type_name} has assisted parameters and must be created via Locator::create or a factory bound with LocatorBuilder::bind_factory")]
    AssistedRequired { type_name: &'static str },

    /// Stored value does not have the requested type
    #[error("Type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },

    /// A dependency descriptor cannot be satisfied as declared
    #[error("Invalid dependency descriptor: {0}")]
    InvalidDescriptor(String),

    /// Wiring request rejected at registration time
    #[error("Invalid binding: {0}")]
    InvalidBinding(String),

    /// Configuration value could not be interpreted
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A factory outlived the locator it resolves from
    #[error("Locator has been dropped")]
    LocatorDropped,
}

impl DiError {
    /// Converts an error returned by construction code for `type_name`.
    ///
    /// Errors that already belong to this taxonomy pass through unwrapped.
    pub fn from_construction(type_name: &'static str, err: BoxError) -> Self {
        match err.downcast::<DiError>() {
            Ok(di) => *di,
            Err(other) => DiError::ConstructionFailure {
                type_name,
                source: Arc::from(other),
            },
        }
    }

    pub(crate) fn not_registered(key: &crate::Key) -> Self {
        DiError::NotRegistered { key: key.to_string() }
    }
}

/// Result type for locator operations
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{DiResult, DiError};
///
/// fn lookup() -> DiResult<u32> {
///     Err(DiError::NotRegistered { key: "u32".to_string() })
/// }
///
/// assert!(lookup().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_errors_pass_through_construction() {
        let boxed: BoxError = Box::new(DiError::LocatorDropped);
        assert!(matches!(
            DiError::from_construction("T", boxed),
            DiError::LocatorDropped
        ));
    }

    #[test]
    fn foreign_errors_are_wrapped() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = DiError::from_construction("app::Store", Box::new(io));
        match &err {
            DiError::ConstructionFailure { type_name, source } => {
                assert_eq!(*type_name, "app::Store");
                assert_eq!(source.to_string(), "disk gone");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("app::Store"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn circular_message_lists_chain() {
        let err = DiError::Circular {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: A -> B -> A");
    }
}
