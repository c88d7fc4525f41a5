use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use snafu::prelude::*;

use crate::key::TypeKey;

/// A constructed bean with its concrete type erased.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A bean cast to the type it was looked up by, boxed as `Box<Arc<T>>`.
pub type ErasedBean = Box<dyn Any + Send + Sync>;

/// Type-erased bean lookup.
///
/// Broad lookups (`dyn_provide`, `dyn_provide_all`) consider every bean
/// visible as the requested type and hide beans subsumed by an intercepting
/// decorator. Exact lookups (`dyn_provide_exact`, `dyn_provide_exact_all`)
/// only consider beans whose concrete type is the requested type and never
/// hide anything.
///
/// Application code normally goes through [`TypedBeanProvider`], which is
/// implemented for every `BeanProvider`.
#[cfg_attr(test, mockall::automock)]
pub trait BeanProvider: Send + Sync {
    fn dyn_provide(&self, key: TypeKey) -> Result<ErasedBean, LookupError>;

    fn dyn_provide_all(&self, key: TypeKey) -> Result<Vec<ErasedBean>, LookupError>;

    fn dyn_provide_exact(&self, key: TypeKey) -> Result<ErasedBean, LookupError>;

    fn dyn_provide_exact_all(&self, key: TypeKey) -> Result<Vec<ErasedBean>, LookupError>;
}

pub trait TypedBeanProvider: BeanProvider {
    /// Returns the only bean visible as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] if no bean is visible as `T`, or
    /// [`LookupError::Ambiguous`] if more than one is. Construction failures
    /// of the bean or of its dependencies are propagated.
    fn provide<T>(&self) -> Result<Arc<T>, LookupError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.dyn_provide(TypeKey::of::<T>()).map(unerase::<T>)
    }

    /// Returns every bean visible as `T`, in registration order. An empty
    /// result is not an error.
    fn provide_all<T>(&self) -> Result<Vec<Arc<T>>, LookupError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.dyn_provide_all(TypeKey::of::<T>())
            .map(|beans| beans.into_iter().map(unerase::<T>).collect())
    }

    /// Returns the only bean whose concrete type is exactly `T`, even if a
    /// decorator intercepts it.
    fn provide_exact<T>(&self) -> Result<Arc<T>, LookupError>
    where
        T: Send + Sync + 'static,
    {
        self.dyn_provide_exact(TypeKey::of::<T>()).map(unerase::<T>)
    }

    fn provide_exact_all<T>(&self) -> Result<Vec<Arc<T>>, LookupError>
    where
        T: Send + Sync + 'static,
    {
        self.dyn_provide_exact_all(TypeKey::of::<T>())
            .map(|beans| beans.into_iter().map(unerase::<T>).collect())
    }
}

impl<P: BeanProvider + ?Sized> TypedBeanProvider for P {}

fn unerase<T>(bean: ErasedBean) -> Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    match bean.downcast::<Arc<T>>() {
        Ok(bean) => *bean,
        Err(_) => unreachable!("the bean's type should be `Arc<T>`"),
    }
}

#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum LookupError {
    #[snafu(display(
        "could not find any bean visible as {key}{}",
        InterceptionHint(*intercepted_by)
    ))]
    #[non_exhaustive]
    NotFound {
        key: TypeKey,
        /// The decorator hiding `key` from broad lookups, if any.
        intercepted_by: Option<TypeKey>,
    },
    #[snafu(display("found {count} beans visible as {key} while exactly one is expected"))]
    #[non_exhaustive]
    Ambiguous { key: TypeKey, count: usize },
    #[snafu(display("could not construct the bean {key} which depends on itself somehow"))]
    #[non_exhaustive]
    CyclicDependency { key: TypeKey },
    #[snafu(display("could not construct the bean {key}"))]
    #[non_exhaustive]
    Instantiation {
        key: TypeKey,
        source: Arc<dyn Error + Send + Sync>,
    },
}

impl LookupError {
    pub(crate) fn not_found(key: TypeKey) -> Self {
        Self::NotFound {
            key,
            intercepted_by: None,
        }
    }

    /// The type whose lookup or construction failed.
    pub fn key(&self) -> TypeKey {
        match self {
            Self::NotFound { key, .. }
            | Self::Ambiguous { key, .. }
            | Self::CyclicDependency { key }
            | Self::Instantiation { key, .. } => *key,
        }
    }
}

struct InterceptionHint(Option<TypeKey>);

impl Display for InterceptionHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.0 {
            Some(decorator) => write!(
                f,
                ", since it is intercepted by {decorator}; look it up through a trait role it provides, or with `provide_exact`"
            ),
            None => Ok(()),
        }
    }
}
