//! Factory synthesis.
//!
//! A factory interface is a user trait with one abstract method whose
//! arguments feed the assisted parameters of a target type. The locator
//! implements such traits at runtime through a [`FactoryDispatcher`] that
//! closes over a parameter mapping computed once, when the factory is
//! synthesized.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::descriptors::Param;
use crate::error::{DiError, DiResult};
use crate::inject::{Blueprint, Injectable};
use crate::key::{normalize_qualifier, Key, TypeKey};
use crate::provider::{Locator, LocatorInner, ResolverContext};
use crate::registration::{erase, AnyArc, Recipe};

/// Role of a method declared by a factory interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Required method without a default body; the factory operation
    Abstract,
    /// Method with a default body
    Provided,
    /// Associated function without a receiver
    Associated,
    /// Identity, equality or string-representation method
    Identity,
}

/// One argument of a factory method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryParam {
    ty: TypeKey,
    name: Option<Arc<str>>,
}

impl FactoryParam {
    /// Argument of type `V`, optionally carrying an assisted name.
    pub fn new<V: ?Sized + 'static>(name: Option<&str>) -> Self {
        Self {
            ty: TypeKey::of::<V>(),
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

/// Signature of one method of a factory interface.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: &'static str,
    pub kind: MethodKind,
    pub params: Vec<FactoryParam>,
    pub returns: TypeKey,
}

impl MethodSpec {
    pub fn new(
        name: &'static str,
        kind: MethodKind,
        params: Vec<FactoryParam>,
        returns: TypeKey,
    ) -> Self {
        Self {
            name,
            kind,
            params,
            returns,
        }
    }
}

/// A trait object type the locator can implement as a factory.
///
/// Implemented for `dyn Trait`, usually through [`factory_interface!`].
/// `methods` describes the trait; `implement` wraps a dispatcher into a
/// value of the trait whose abstract method forwards its arguments, in
/// declaration order, to [`FactoryDispatcher::dispatch`].
pub trait FactoryInterface: Send + Sync + 'static {
    /// Value returned by the factory method.
    type Product: Send + 'static;

    fn methods() -> Vec<MethodSpec>;

    fn implement(dispatcher: FactoryDispatcher<Self::Product>) -> Arc<Self>;
}

/// Arguments of one factory call, in declaration order.
type CallArgs = Vec<Box<dyn Any + Send>>;

type BuildFn<P> = dyn Fn(&ResolverContext<'_>, CallArgs) -> DiResult<P> + Send + Sync;

/// Runtime body of a synthesized factory method.
///
/// Holds a weak handle to its locator, so a factory kept beyond the
/// locator's lifetime fails with [`DiError::LocatorDropped`].
pub struct FactoryDispatcher<P> {
    locator: Weak<LocatorInner>,
    target: &'static str,
    arity: usize,
    build: Arc<BuildFn<P>>,
}

impl<P> Clone for FactoryDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            locator: self.locator.clone(),
            target: self.target,
            arity: self.arity,
            build: self.build.clone(),
        }
    }
}

impl<P> fmt::Debug for FactoryDispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryDispatcher")
            .field("target", &self.target)
            .field("arity", &self.arity)
            .finish()
    }
}

impl<P> FactoryDispatcher<P> {
    /// Builds a fresh product from one call's arguments.
    ///
    /// Non-assisted parameters are resolved again on every call, so shared
    /// bindings stay shared across products. A call made while a recipe of
    /// the same locator runs on this thread continues that recipe's
    /// resolution chain, so a product depending on the caller fails with
    /// [`DiError::Circular`].
    pub fn dispatch(&self, args: Vec<Box<dyn Any + Send>>) -> DiResult<P> {
        if args.len() != self.arity {
            return Err(DiError::FactoryContractViolation(format!(
                "factory for {} takes {} arguments, got {}",
                self.target,
                self.arity,
                args.len()
            )));
        }
        let locator = Locator::upgrade(&self.locator)?;
        locator.with_chain(|chain| (self.build)(&ResolverContext::new(&locator, chain), args))
    }

    /// Type built by this dispatcher.
    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// The single abstract method of `F`.
fn factory_method<F: FactoryInterface + ?Sized>() -> DiResult<MethodSpec> {
    let interface = std::any::type_name::<F>();
    let mut abstract_methods = F::methods()
        .into_iter()
        .filter(|m| m.kind == MethodKind::Abstract);

    let method = abstract_methods.next().ok_or_else(|| {
        DiError::FactoryContractViolation(format!("{interface} has no abstract method"))
    })?;
    if abstract_methods.next().is_some() {
        return Err(DiError::FactoryContractViolation(format!(
            "{interface} must have exactly one abstract method"
        )));
    }
    if method.returns != TypeKey::of::<F::Product>() {
        return Err(DiError::FactoryContractViolation(format!(
            "{interface}::{} returns {}, expected {}",
            method.name,
            method.returns,
            std::any::type_name::<F::Product>()
        )));
    }
    Ok(method)
}

/// For each constructor parameter, the factory argument that feeds it
/// (`None` for parameters resolved from the locator).
///
/// Every assisted parameter must claim one argument and every argument must
/// be claimed.
fn parameter_mapping(
    target: &'static str,
    params: &[Param],
    factory_params: &[FactoryParam],
) -> DiResult<Vec<Option<usize>>> {
    let mut used = vec![false; factory_params.len()];
    let mut mapping = Vec::with_capacity(params.len());

    for param in params {
        let Param::Assisted(spec) = param else {
            mapping.push(None);
            continue;
        };
        let found = factory_params
            .iter()
            .enumerate()
            .find(|(i, fp)| !used[*i] && fp.ty() == spec.ty() && fp.name() == spec.name())
            .map(|(i, _)| i)
            .ok_or_else(|| {
                DiError::FactoryContractViolation(format!(
                    "no factory parameter matches assisted {spec} of {target}"
                ))
            })?;
        used[found] = true;
        mapping.push(Some(found));
    }

    if let Some(unclaimed) = used.iter().position(|u| !u) {
        return Err(DiError::FactoryContractViolation(format!(
            "factory parameter at index {unclaimed} ({}) does not match any assisted parameter of {target}",
            factory_params[unclaimed].ty()
        )));
    }
    Ok(mapping)
}

/// Synthesizes a factory `F` building `T`, validating the mapping now.
pub(crate) fn synthesize<F, T>(locator: &Locator) -> DiResult<Arc<F>>
where
    F: FactoryInterface + ?Sized,
    T: Injectable + Into<F::Product>,
{
    let target = std::any::type_name::<T>();
    let method = factory_method::<F>()?;
    let blueprint = Blueprint::<T>::of();
    let mapping = parameter_mapping(target, blueprint.params(), &method.params)?;
    tracing::debug!(
        factory = std::any::type_name::<F>(),
        target,
        method = method.name,
        "factory synthesized"
    );

    let build = move |ctx: &ResolverContext<'_>, args: CallArgs| -> DiResult<F::Product> {
        let mut supplied: Vec<Option<Box<dyn Any + Send>>> = args.into_iter().map(Some).collect();
        let value = blueprint.instantiate(ctx, |index, spec| {
            mapping
                .get(index)
                .copied()
                .flatten()
                .and_then(|arg| supplied.get_mut(arg).and_then(Option::take))
                .ok_or_else(|| {
                    DiError::FactoryContractViolation(format!("no argument supplied for {spec}"))
                })
        })?;
        Ok(value.into())
    };

    Ok(F::implement(FactoryDispatcher {
        locator: locator.downgrade(),
        target,
        arity: method.params.len(),
        build: Arc::new(build),
    }))
}

/// Recipe producing the factory `F` for target `T`.
pub(crate) fn factory_recipe<F, T>() -> Recipe
where
    F: FactoryInterface + ?Sized,
    T: Injectable + Into<F::Product>,
{
    let ctor = |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
        synthesize::<F, T>(ctx.locator()).map(erase)
    };
    Arc::new(ctor)
}

impl Locator {
    /// Synthesizes a factory `F` whose product is built directly.
    ///
    /// Fails immediately with [`DiError::FactoryContractViolation`] when the
    /// interface or the parameter mapping is unusable.
    pub fn create_factory<F>(&self) -> DiResult<Arc<F>>
    where
        F: FactoryInterface + ?Sized,
        F::Product: Injectable,
    {
        synthesize::<F, F::Product>(self)
    }

    /// Synthesizes a factory `F` building `T` and converting it into the
    /// product type.
    pub fn create_factory_for<F, T>(&self) -> DiResult<Arc<F>>
    where
        F: FactoryInterface + ?Sized,
        T: Injectable + Into<F::Product>,
    {
        synthesize::<F, T>(self)
    }

    /// Whether a synthesized factory is bound for `F`.
    pub fn has_factory<F: FactoryInterface + ?Sized>(&self) -> bool {
        self.has_key(&Key::of::<F>())
    }
}

/// Declares a factory trait and implements [`FactoryInterface`] for it.
///
/// The trait gets one method returning `DiResult<Product>`. Arguments
/// marked `#[assisted("name")]` match assisted parameters with that name;
/// unmarked arguments match unnamed assisted parameters by type.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{factory_interface, Args, ConstructResult, Injectable,
///     LocatorBuilder, Param, Resolver};
/// use std::sync::Arc;
///
/// struct Renderer;
///
/// struct Widget { title: String, renderer: Arc<Renderer> }
///
/// impl Injectable for Widget {
///     fn parameters() -> Vec<Param> {
///         vec![Param::assisted_named::<String>("title"), Param::inject::<Renderer>()]
///     }
///
///     fn construct(args: &mut Args) -> ConstructResult<Self> {
///         Ok(Widget { title: args.assisted()?, renderer: args.inject()? })
///     }
/// }
///
/// factory_interface! {
///     trait WidgetFactory {
///         fn create(&self, #[assisted("title")] title: String) -> Widget;
///     }
/// }
///
/// let mut builder = LocatorBuilder::new();
/// builder.provide_singleton::<Renderer, _>(|_| Ok(Renderer));
/// builder.bind_factory::<dyn WidgetFactory>();
/// let locator = builder.build().unwrap();
///
/// let factory = locator.get::<dyn WidgetFactory>().unwrap();
/// let a = factory.create("a".into()).unwrap();
/// let b = factory.create("b".into()).unwrap();
/// assert_ne!(a.title, b.title);
/// assert!(Arc::ptr_eq(&a.renderer, &b.renderer));
/// ```
#[macro_export]
macro_rules! factory_interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            fn $method:ident(&self $(, $(#[assisted($label:literal)])? $arg:ident : $ty:ty)* $(,)?) -> $product:ty;
        }
    ) => {
        $(#[$meta])*
        $vis trait $name: Send + Sync {
            fn $method(&self $(, $arg: $ty)*) -> $crate::DiResult<$product>;
        }

        impl $crate::FactoryInterface for dyn $name {
            type Product = $product;

            fn methods() -> ::std::vec::Vec<$crate::MethodSpec> {
                ::std::vec![$crate::MethodSpec::new(
                    ::core::stringify!($method),
                    $crate::MethodKind::Abstract,
                    ::std::vec![$(
                        $crate::FactoryParam::new::<$ty>(
                            ::core::option::Option::<&str>::None
                                $(.or(::core::option::Option::Some($label)))?
                        )
                    ),*],
                    $crate::TypeKey::of::<$product>(),
                )]
            }

            fn implement(
                dispatcher: $crate::FactoryDispatcher<$product>,
            ) -> ::std::sync::Arc<Self> {
                struct Synthesized($crate::FactoryDispatcher<$product>);

                impl $name for Synthesized {
                    fn $method(&self $(, $arg: $ty)*) -> $crate::DiResult<$product> {
                        self.0.dispatch(::std::vec![$(
                            ::std::boxed::Box::new($arg) as ::std::boxed::Box<dyn ::std::any::Any + Send>
                        ),*])
                    }
                }

                ::std::sync::Arc::new(Synthesized(dispatcher))
            }
        }
    };
}
