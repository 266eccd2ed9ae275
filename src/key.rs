//! Binding key types for the locator registry.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime identity of a bindable type.
///
/// Pairs the `TypeId` with the `type_name` for diagnostics. Works for sized
/// types and for trait objects (`dyn Trait`) alike. Equality and hashing use
/// the `TypeId` only.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::TypeKey;
///
/// trait Greeter: Send + Sync {}
///
/// let a = TypeKey::of::<String>();
/// let b = TypeKey::of::<String>();
/// assert_eq!(a, b);
/// assert_ne!(a, TypeKey::of::<dyn Greeter>());
/// assert_eq!(a.simple_name(), "String");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Identity of `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, without generic arguments.
    ///
    /// `dyn app::net::Transport` becomes `Transport`,
    /// `app::Cache<u32>` becomes `Cache`.
    pub fn simple_name(&self) -> &'static str {
        simple_name_of(self.name)
    }
}

pub(crate) fn simple_name_of(full: &'static str) -> &'static str {
    let base = full.strip_prefix("dyn ").unwrap_or(full);
    let base = match base.find('<') {
        Some(pos) => &base[..pos],
        None => base,
    };
    match base.rfind("::") {
        Some(pos) => &base[pos + 2..],
        None => base,
    }
}

impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Normalizes a qualifier: surrounding whitespace is trimmed and a blank
/// qualifier is treated as absent.
pub fn normalize_qualifier(raw: Option<&str>) -> Option<Arc<str>> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Arc::from(trimmed))
    }
}

/// Identity of one registry entry: a type plus an optional qualifier.
///
/// Keys are immutable and compare structurally. The qualifier is normalized
/// on construction so `Key::named::<T>("  ")` equals `Key::of::<T>()`.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::Key;
///
/// let plain = Key::of::<u32>();
/// let named = Key::named::<u32>(" port ");
///
/// assert!(!plain.is_named());
/// assert_eq!(named.qualifier(), Some("port"));
/// assert_eq!(named.unnamed(), plain);
/// assert_eq!(Key::named::<u32>(""), plain);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    ty: TypeKey,
    qualifier: Option<Arc<str>>,
}

impl Key {
    /// Unqualified key for `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeKey::of::<T>(),
            qualifier: None,
        }
    }

    /// Qualified key for `T`; a blank qualifier yields the unqualified key.
    pub fn named<T: ?Sized + 'static>(qualifier: impl AsRef<str>) -> Self {
        Self::new(TypeKey::of::<T>(), Some(qualifier.as_ref()))
    }

    /// Key for an already erased type.
    pub fn new(ty: TypeKey, qualifier: Option<&str>) -> Self {
        Self {
            ty,
            qualifier: normalize_qualifier(qualifier),
        }
    }

    pub(crate) fn with_qualifier(ty: TypeKey, qualifier: Option<Arc<str>>) -> Self {
        Self { ty, qualifier }
    }

    pub fn type_key(&self) -> TypeKey {
        self.ty
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn is_named(&self) -> bool {
        self.qualifier.is_some()
    }

    /// The same key with the qualifier dropped.
    pub fn unnamed(&self) -> Self {
        Self {
            ty: self.ty,
            qualifier: None,
        }
    }

    /// Type name for display.
    pub fn display_name(&self) -> &'static str {
        self.ty.name
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}[name={}]", self.ty.name, q),
            None => f.write_str(self.ty.name),
        }
    }
}
