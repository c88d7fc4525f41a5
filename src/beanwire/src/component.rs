use std::error::Error;

use crate::definition::BeanDefinition;
use crate::key::TypeKey;
use crate::provider::{BeanProvider, LookupError};

/// A type the container knows how to construct from other beans.
///
/// `Component` is usually implemented by the [`component`](crate::component)
/// attribute, which also registers the component so that
/// [`get_instance!`](crate::get_instance) can find it. Implementing it by
/// hand is useful for types registered explicitly through a
/// [`Module`](crate::module::Module).
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// use beanwire::prelude::*;
///
/// struct Clock;
///
/// struct Scheduler {
///     clock: Arc<Clock>,
/// }
///
/// impl Component for Scheduler {
///     type Error = Infallible;
///
///     fn construct(
///         provider: &dyn BeanProvider,
///     ) -> Result<Result<Self, Self::Error>, LookupError> {
///         let clock = provider.provide::<Clock>()?;
///         Ok(Ok(Scheduler { clock }))
///     }
///
///     fn definition() -> BeanDefinition {
///         DefinitionBuilder::<Self>::new(module_path!()).build()
///     }
/// }
/// ```
pub trait Component: Send + Sync + Sized + 'static {
    /// The error type of a fallible constructor, or [`Infallible`] when the
    /// constructor always succeeds.
    ///
    /// [`Infallible`]: std::convert::Infallible
    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// Looks up the dependencies and invokes the constructor.
    ///
    /// # Errors
    ///
    /// The outer `Result` carries lookup failures of the dependencies, the
    /// inner one the constructor's own failure.
    #[allow(clippy::type_complexity)]
    fn construct(provider: &dyn BeanProvider) -> Result<Result<Self, Self::Error>, LookupError>;

    /// Describes how the component is registered: its scope, the roles it is
    /// visible as and, for decorators, the type it intercepts.
    fn definition() -> BeanDefinition;
}

/// Implemented by decorators generated for transactional components.
///
/// A registered decorator hides the type it intercepts from broad lookups.
pub trait Intercepted: Send + Sync {
    fn intercepted_type(&self) -> TypeKey;
}
