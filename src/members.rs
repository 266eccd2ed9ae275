//! Post-construction member injection.
//!
//! Rust has neither inheritance nor reflective field access, so a type
//! describes its injection points explicitly as a [`MemberPlan`]. The plan is
//! split into levels, the most general one first, mirroring a base-to-derived
//! walk over a type hierarchy.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::Dependency;
use crate::error::{ConstructResult, DiError, DiResult};
use crate::inject::Args;
use crate::traits::ResolverCore;

/// Applies resolved member values to a constructed instance.
pub type MemberApply<T> = Arc<dyn Fn(&mut T, &mut Args) -> ConstructResult<()> + Send + Sync>;

/// What a marked member is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Assignable field
    Field,
    /// Instance method receiving the resolved values
    Method,
    /// Field that cannot be reassigned after construction
    ReadOnlyField,
    /// Field belonging to the type rather than the instance
    StaticField,
    /// Method belonging to the type rather than the instance
    StaticMethod,
    /// Method without a body
    AbstractMethod,
}

impl MemberKind {
    /// Reason this kind cannot receive injection, if any.
    pub fn rejection(self) -> Option<&'static str> {
        match self {
            MemberKind::Field | MemberKind::Method => None,
            MemberKind::ReadOnlyField => Some("final fields cannot be injected"),
            MemberKind::StaticField => Some("static fields cannot be injected"),
            MemberKind::StaticMethod => Some("static methods cannot be injected"),
            MemberKind::AbstractMethod => Some("abstract methods cannot be injected"),
        }
    }
}

/// One marked field or method.
pub struct Member<T> {
    name: String,
    kind: MemberKind,
    dependencies: Vec<Dependency>,
    apply: Option<MemberApply<T>>,
}

impl<T> Member<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

struct Level<T> {
    owner: &'static str,
    members: Vec<Member<T>>,
}

/// Ordered injection points of a type.
///
/// Members added before the first [`level`](Self::level) call belong to a
/// level named after `T` itself.
///
/// # Examples
///
/// ```
/// use ferrous_locator::{Args, ConstructResult, Dependency, Injectable, LocatorBuilder,
///     MemberPlan, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Metrics;
///
/// #[derive(Default)]
/// struct Handler {
///     clock: Option<Arc<Clock>>,
///     metrics: Option<Arc<Metrics>>,
/// }
///
/// impl Injectable for Handler {
///     fn construct(_: &mut Args) -> ConstructResult<Self> {
///         Ok(Handler::default())
///     }
///
///     fn members() -> MemberPlan<Self> {
///         MemberPlan::new()
///             .level("app::BaseHandler")
///             .field("clock", Dependency::single::<Clock>(), |h: &mut Handler, a| {
///                 h.clock = Some(a.inject()?);
///                 Ok(())
///             })
///             .level("app::Handler")
///             .method("set_metrics", vec![Dependency::single::<Metrics>()], |h: &mut Handler, a| {
///                 h.metrics = Some(a.inject()?);
///                 Ok(())
///             })
///     }
/// }
///
/// let mut builder = LocatorBuilder::new();
/// builder.instance(Clock);
/// builder.instance(Metrics);
/// builder.component::<Handler>();
/// let locator = builder.build().unwrap();
///
/// let handler = locator.get::<Handler>().unwrap();
/// assert!(handler.clock.is_some() && handler.metrics.is_some());
/// ```
pub struct MemberPlan<T> {
    levels: Vec<Level<T>>,
}

impl<T: 'static> MemberPlan<T> {
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    /// Starts the next, more derived level.
    pub fn level(mut self, owner: &'static str) -> Self {
        self.levels.push(Level {
            owner,
            members: Vec::new(),
        });
        self
    }

    /// Field filled from one dependency.
    pub fn field<F>(self, name: impl Into<String>, dependency: Dependency, apply: F) -> Self
    where
        F: Fn(&mut T, &mut Args) -> ConstructResult<()> + Send + Sync + 'static,
    {
        let apply: MemberApply<T> = Arc::new(apply);
        self.push(name, MemberKind::Field, vec![dependency], Some(apply))
    }

    /// Method invoked with one value per dependency.
    pub fn method<F>(self, name: impl Into<String>, dependencies: Vec<Dependency>, apply: F) -> Self
    where
        F: Fn(&mut T, &mut Args) -> ConstructResult<()> + Send + Sync + 'static,
    {
        let apply: MemberApply<T> = Arc::new(apply);
        self.push(name, MemberKind::Method, dependencies, Some(apply))
    }

    /// Marks a member that cannot receive injection. Resolution of `T`
    /// fails with [`DiError::InvalidMemberTarget`] before anything is built.
    pub fn invalid(self, name: impl Into<String>, kind: MemberKind, dependencies: Vec<Dependency>) -> Self {
        self.push(name, kind, dependencies, None)
    }

    pub fn read_only_field(self, name: impl Into<String>, dependency: Dependency) -> Self {
        self.invalid(name, MemberKind::ReadOnlyField, vec![dependency])
    }

    pub fn static_method(self, name: impl Into<String>, dependencies: Vec<Dependency>) -> Self {
        self.invalid(name, MemberKind::StaticMethod, dependencies)
    }

    fn push(
        mut self,
        name: impl Into<String>,
        kind: MemberKind,
        dependencies: Vec<Dependency>,
        apply: Option<MemberApply<T>>,
    ) -> Self {
        if self.levels.is_empty() {
            self = self.level(std::any::type_name::<T>());
        }
        let member = Member {
            name: name.into(),
            kind,
            dependencies,
            apply,
        };
        if let Some(level) = self.levels.last_mut() {
            level.members.push(member);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|l| l.members.is_empty())
    }

    /// Members in injection order.
    pub fn members(&self) -> impl Iterator<Item = &Member<T>> + '_ {
        self.levels.iter().flat_map(|l| l.members.iter())
    }

    /// Fails on the first member that cannot receive injection.
    pub(crate) fn validate(&self) -> DiResult<()> {
        for level in &self.levels {
            for member in &level.members {
                let rejected = member
                    .kind
                    .rejection()
                    .or(member.apply.is_none().then_some("member has no injection body"));
                if let Some(reason) = rejected {
                    return Err(DiError::InvalidMemberTarget {
                        type_name: level.owner,
                        member: member.name.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolves and applies every member, level by level.
    pub(crate) fn apply(&self, target: &mut T, resolver: &dyn ResolverCore) -> DiResult<()> {
        for level in &self.levels {
            for member in &level.members {
                let Some(apply) = &member.apply else {
                    continue;
                };
                let mut args = Args::new(level.owner);
                for dep in &member.dependencies {
                    args.push_resolved(resolver.resolve_dependency(dep)?);
                }
                apply(target, &mut args)
                    .map_err(|e| DiError::from_construction(level.owner, e))?;
            }
        }
        Ok(())
    }
}

impl<T: 'static> Default for MemberPlan<T> {
    fn default() -> Self {
        Self::new()
    }
}
