//! Assisted creation: constructor parameters supplied by the caller.
//!
//! Parameters declared with [`Param::assisted`](crate::Param::assisted) are
//! matched against caller values by name and type; the rest come from the
//! locator as usual.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::descriptors::AssistedParam;
use crate::error::{DiError, DiResult};
use crate::inject::{Blueprint, Injectable};
use crate::internal::ResolutionChain;
use crate::key::{normalize_qualifier, TypeKey};
use crate::provider::{Locator, ResolverContext};

/// A caller-supplied constructor argument, optionally named.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{assisted, AssistedValue};
///
/// let plain = AssistedValue::of(8080u16);
/// let named = assisted("host", "localhost".to_string());
/// assert_eq!(plain.name(), None);
/// assert_eq!(named.name(), Some("host"));
/// ```
pub struct AssistedValue {
    name: Option<Arc<str>>,
    ty: TypeKey,
    value: Box<dyn Any + Send>,
}

impl AssistedValue {
    /// Unnamed value, matched by type.
    pub fn of<V: Send + 'static>(value: V) -> Self {
        Self {
            name: None,
            ty: TypeKey::of::<V>(),
            value: Box::new(value),
        }
    }

    /// Value matched only by an assisted parameter with the same name.
    /// A blank name makes the value unnamed.
    pub fn named<V: Send + 'static>(name: &str, value: V) -> Self {
        Self {
            name: normalize_qualifier(Some(name)),
            ty: TypeKey::of::<V>(),
            value: Box::new(value),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_key(&self) -> TypeKey {
        self.ty
    }
}

impl fmt::Debug for AssistedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistedValue")
            .field("name", &self.name)
            .field("type", &self.ty.name())
            .finish()
    }
}

/// Shorthand for [`AssistedValue::named`].
pub fn assisted<V: Send + 'static>(name: &str, value: V) -> AssistedValue {
    AssistedValue::named(name, value)
}

/// Finds the caller value for one assisted parameter.
///
/// A named parameter accepts only a value with the same name. An unnamed
/// parameter takes the first unused unnamed value of its type. Types are
/// compatible when their `TypeId`s are equal, so the exact pass and the
/// compatible pass of the matching order coincide.
pub(crate) fn find_match<'v, I>(param: &AssistedParam, candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = (usize, Option<&'v str>, TypeKey)>,
{
    let wanted = param.name();
    candidates
        .into_iter()
        .find(|(_, name, ty)| *ty == param.ty() && *name == wanted)
        .map(|(index, _, _)| index)
}

/// Pairs assisted parameters with caller values; result is indexed by
/// parameter position.
fn match_values(
    target: &'static str,
    params: &[crate::Param],
    values: Vec<AssistedValue>,
) -> DiResult<Vec<Option<Box<dyn Any + Send>>>> {
    let mut pool: Vec<Option<AssistedValue>> = values.into_iter().map(Some).collect();
    let mut matched: Vec<Option<Box<dyn Any + Send>>> = Vec::with_capacity(params.len());

    for (index, param) in params.iter().enumerate() {
        let crate::Param::Assisted(spec) = param else {
            matched.push(None);
            continue;
        };
        let available = pool.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().map(|v| (i, v.name(), v.type_key()))
        });
        let found = find_match(spec, available).ok_or_else(|| {
            DiError::AssistedArgumentMismatch(format!(
                "no matching assisted argument for parameter {spec} at index {index} of {target}"
            ))
        })?;
        matched.push(pool[found].take().map(|v| v.value));
    }

    if let Some((index, unused)) = pool
        .iter()
        .enumerate()
        .find_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    {
        let label = unused
            .name()
            .map(|n| format!(" (name='{n}')"))
            .unwrap_or_default();
        return Err(DiError::AssistedArgumentMismatch(format!(
            "unused assisted argument at index {index}{label} of type {} for {target}",
            unused.type_key()
        )));
    }

    Ok(matched)
}

fn create_in<T: Injectable>(
    locator: &Locator,
    chain: &ResolutionChain<'_>,
    values: Vec<AssistedValue>,
) -> DiResult<T> {
    let target = std::any::type_name::<T>();
    let blueprint = Blueprint::<T>::of();
    let mut matched = match_values(target, blueprint.params(), values)?;
    let ctx = ResolverContext::new(locator, chain);
    blueprint.instantiate(&ctx, |index, spec| {
        matched
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| {
                DiError::AssistedArgumentMismatch(format!("parameter {spec} of {target} has no value"))
            })
    })
}

impl Locator {
    /// Builds a fresh `T`, taking assisted parameters from `values` and
    /// everything else from the locator.
    ///
    /// Every assisted parameter must find a value and every value must be
    /// used, otherwise [`DiError::AssistedArgumentMismatch`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_locator::{assisted, Args, AssistedValue, ConstructResult, Injectable,
    ///     LocatorBuilder, Param};
    /// use std::sync::Arc;
    ///
    /// struct Pool;
    ///
    /// struct Session { pool: Arc<Pool>, user: String, ttl: u64 }
    ///
    /// impl Injectable for Session {
    ///     fn parameters() -> Vec<Param> {
    ///         vec![
    ///             Param::inject::<Pool>(),
    ///             Param::assisted_named::<String>("user"),
    ///             Param::assisted::<u64>(),
    ///         ]
    ///     }
    ///
    ///     fn construct(args: &mut Args) -> ConstructResult<Self> {
    ///         Ok(Session { pool: args.inject()?, user: args.assisted()?, ttl: args.assisted()? })
    ///     }
    /// }
    ///
    /// let mut builder = LocatorBuilder::new();
    /// builder.instance(Pool);
    /// let locator = builder.build().unwrap();
    ///
    /// let session: Session = locator
    ///     .create(vec![AssistedValue::of(30u64), assisted("user", "ana".to_string())])
    ///     .unwrap();
    /// assert_eq!(session.user, "ana");
    /// assert_eq!(session.ttl, 30);
    /// ```
    pub fn create<T: Injectable>(&self, values: Vec<AssistedValue>) -> DiResult<T> {
        self.with_chain(|chain| create_in(self, chain, values))
    }
}

impl ResolverContext<'_> {
    /// Same as [`Locator::create`], keeping the current resolution chain.
    pub fn create<T: Injectable>(&self, values: Vec<AssistedValue>) -> DiResult<T> {
        create_in(self.locator(), self.chain(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Param;

    fn candidates(values: &[AssistedValue]) -> Vec<(usize, Option<&str>, TypeKey)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.name(), v.type_key()))
            .collect()
    }

    #[test]
    fn named_parameters_ignore_unnamed_values() {
        let values = vec![AssistedValue::of("x".to_string()), assisted("id", "y".to_string())];
        let spec = AssistedParam::new(TypeKey::of::<String>(), Some("id"));
        assert_eq!(find_match(&spec, candidates(&values)), Some(1));

        let unnamed = AssistedParam::new(TypeKey::of::<String>(), None);
        assert_eq!(find_match(&unnamed, candidates(&values)), Some(0));
    }

    #[test]
    fn named_values_are_not_used_for_unnamed_parameters() {
        let values = vec![assisted("id", 1u32)];
        let unnamed = AssistedParam::new(TypeKey::of::<u32>(), None);
        assert_eq!(find_match(&unnamed, candidates(&values)), None);
    }

    #[test]
    fn leftover_values_are_rejected() {
        let params = vec![Param::assisted::<u32>()];
        let err = match_values("Demo", &params, vec![AssistedValue::of(1u32), AssistedValue::of(2u32)])
            .unwrap_err();
        assert!(matches!(err, DiError::AssistedArgumentMismatch(ref m) if m.contains("index 1")));
    }

    #[test]
    fn missing_values_are_rejected() {
        let params = vec![Param::inject::<u8>(), Param::assisted_named::<u32>("port")];
        let err = match_values("Demo", &params, vec![AssistedValue::of(1u32)]).unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
