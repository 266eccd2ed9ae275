//! Dependency descriptors: what a constructor parameter, field or method
//! argument asks the locator for.

use std::fmt;
use std::sync::Arc;

use crate::key::{normalize_qualifier, Key, TypeKey};

/// Container shape of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One value
    Single,
    /// Ordered list of every matching binding (or explicit contributions)
    List,
    /// Identity-deduplicated set
    Set,
    /// Qualifier-keyed map; only `String` keys are supported
    Map { key: TypeKey },
}

/// Describes one value to be filled by the locator.
///
/// Descriptors are built once per registered type and reused on every
/// resolution.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{Dependency, Shape};
///
/// trait Plugin: Send + Sync {}
///
/// let deps = [
///     Dependency::single::<u32>().qualified("port"),
///     Dependency::list::<dyn Plugin>(),
///     Dependency::map::<dyn Plugin>(),
/// ];
/// assert_eq!(deps[0].qualifier(), Some("port"));
/// assert_eq!(deps[1].shape(), Shape::List);
/// assert!(matches!(deps[2].shape(), Shape::Map { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    element: TypeKey,
    shape: Shape,
    qualifier: Option<Arc<str>>,
}

impl Dependency {
    pub fn new(element: TypeKey, shape: Shape) -> Self {
        Self {
            element,
            shape,
            qualifier: None,
        }
    }

    pub fn single<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), Shape::Single)
    }

    pub fn list<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), Shape::List)
    }

    pub fn set<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), Shape::Set)
    }

    /// `Map<String, T>`.
    pub fn map<T: ?Sized + 'static>() -> Self {
        Self::map_keyed::<String, T>()
    }

    /// `Map<K, T>`; any `K` other than `String` is rejected at resolution.
    pub fn map_keyed<K: ?Sized + 'static, T: ?Sized + 'static>() -> Self {
        Self::new(
            TypeKey::of::<T>(),
            Shape::Map {
                key: TypeKey::of::<K>(),
            },
        )
    }

    /// Restricts the dependency to one qualifier. Blank qualifiers are ignored.
    pub fn qualified(mut self, qualifier: impl AsRef<str>) -> Self {
        self.qualifier = normalize_qualifier(Some(qualifier.as_ref()));
        self
    }

    /// Raw type (element type for container shapes).
    pub fn element(&self) -> TypeKey {
        self.element
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Registry key of the element type under this descriptor's qualifier.
    pub fn element_key(&self) -> Key {
        Key::with_qualifier(self.element, self.qualifier.clone())
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            Shape::Single => write!(f, "{}", self.element)?,
            Shape::List => write!(f, "List<{}>", self.element)?,
            Shape::Set => write!(f, "Set<{}>", self.element)?,
            Shape::Map { key } => write!(f, "Map<{}, {}>", key, self.element)?,
        }
        if let Some(q) = &self.qualifier {
            write!(f, " named {q}")?;
        }
        Ok(())
    }
}

/// A constructor parameter supplied by the caller at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistedParam {
    ty: TypeKey,
    name: Option<Arc<str>>,
}

impl AssistedParam {
    pub fn new(ty: TypeKey, name: Option<&str>) -> Self {
        Self {
            ty,
            name: normalize_qualifier(name),
        }
    }

    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for AssistedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(n) => write!(f, "{} named '{}'", self.ty, n),
            None => write!(f, "{}", self.ty),
        }
    }
}

/// One declared constructor parameter.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::Param;
///
/// struct Database;
///
/// let params = vec![
///     Param::inject::<Database>(),
///     Param::assisted_named::<String>("url"),
///     Param::assisted::<u32>(),
/// ];
/// assert_eq!(params.iter().filter(|p| p.is_assisted()).count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Resolved from the locator
    Inject(Dependency),
    /// Taken from caller-supplied values
    Assisted(AssistedParam),
}

impl Param {
    pub fn inject<T: ?Sized + 'static>() -> Self {
        Param::Inject(Dependency::single::<T>())
    }

    pub fn named<T: ?Sized + 'static>(qualifier: impl AsRef<str>) -> Self {
        Param::Inject(Dependency::single::<T>().qualified(qualifier))
    }

    pub fn list<T: ?Sized + 'static>() -> Self {
        Param::Inject(Dependency::list::<T>())
    }

    pub fn set<T: ?Sized + 'static>() -> Self {
        Param::Inject(Dependency::set::<T>())
    }

    pub fn map<T: ?Sized + 'static>() -> Self {
        Param::Inject(Dependency::map::<T>())
    }

    pub fn assisted<T: 'static>() -> Self {
        Param::Assisted(AssistedParam::new(TypeKey::of::<T>(), None))
    }

    pub fn assisted_named<T: 'static>(name: impl AsRef<str>) -> Self {
        Param::Assisted(AssistedParam::new(TypeKey::of::<T>(), Some(name.as_ref())))
    }

    pub fn is_assisted(&self) -> bool {
        matches!(self, Param::Assisted(_))
    }
}

impl From<Dependency> for Param {
    fn from(dep: Dependency) -> Self {
        Param::Inject(dep)
    }
}
