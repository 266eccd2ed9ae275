//! Grouped registrations.
//!
//! A [`LocatorModule`] bundles the bindings of one feature area so that
//! applications can wire it with a single call.

use crate::{DiResult, LocatorBuilder};

/// A unit of registrations applied to a [`LocatorBuilder`].
///
/// # Example
///
/// ```rust
/// use ferrous_locator::{DiResult, LocatorBuilder, LocatorModule, Resolver};
/// use std::sync::Arc;
///
/// struct MailConfig { host: String }
/// struct Mailer { config: Arc<MailConfig> }
///
/// struct MailModule { host: String }
///
/// impl LocatorModule for MailModule {
///     fn register(self, builder: &mut LocatorBuilder) -> DiResult<()> {
///         builder
///             .instance(MailConfig { host: self.host })
///             .provide_singleton::<Mailer, _>(|ctx| Ok(Mailer { config: ctx.get()? }));
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut builder = LocatorBuilder::new();
/// builder.add_module(MailModule { host: "smtp.local".to_string() })?;
/// let locator = builder.build()?;
/// assert_eq!(locator.get::<Mailer>()?.config.host, "smtp.local");
/// # Ok(())
/// # }
/// ```
pub trait LocatorModule {
    /// Adds this module's bindings to `builder`.
    fn register(self, builder: &mut LocatorBuilder) -> DiResult<()>;
}

impl<F> LocatorModule for F
where
    F: FnOnce(&mut LocatorBuilder) -> DiResult<()>,
{
    fn register(self, builder: &mut LocatorBuilder) -> DiResult<()> {
        self(builder)
    }
}
