//! Transaction boundaries spliced around intercepted methods.
//!
//! The decorators generated by `#[transactional]` route every marked method
//! through [`intercept`] or [`intercept_fallible`]:
//!
//! 1. `begin` is invoked on the [`TransactionManager`];
//! 2. the delegate's method is called;
//! 3. on success `commit` is invoked and the result is returned;
//! 4. on failure `rollback` is invoked and the failure is propagated.
//!
//! A failing `begin` or `commit` is a failure as well and is rolled back. If
//! the rollback itself fails, a [`TransactionFailure::Rollback`] carrying the
//! original failure as its cause is raised instead of the original failure.

use std::any::Any;
use std::convert::Infallible;
use std::error::Error;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use snafu::prelude::*;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// The transaction capability consumed by intercepted components.
#[cfg_attr(test, mockall::automock)]
pub trait TransactionManager: Send + Sync {
    fn begin(&self) -> Result<(), BoxError>;

    fn commit(&self) -> Result<(), BoxError>;

    fn rollback(&self) -> Result<(), BoxError>;
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum TransactionFailure {
    #[snafu(display("could not begin the transaction around {method}"))]
    #[non_exhaustive]
    Begin { method: &'static str, source: BoxError },
    #[snafu(display("could not commit the transaction around {method}"))]
    #[non_exhaustive]
    Commit { method: &'static str, source: BoxError },
    #[snafu(display("could not roll back the transaction around {method}"))]
    #[non_exhaustive]
    Rollback {
        method: &'static str,
        source: BoxError,
        cause: Option<BoxError>,
    },
}

impl TransactionFailure {
    /// The intercepted method, as `Type::method`.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Begin { method, .. }
            | Self::Commit { method, .. }
            | Self::Rollback { method, .. } => *method,
        }
    }

    /// The failure that triggered a failed rollback.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::Rollback { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

impl From<TransactionFailure> for io::Error {
    fn from(failure: TransactionFailure) -> Self {
        io::Error::other(failure)
    }
}

/// Runs an infallible method inside a transaction.
///
/// A panic in `call` is rolled back and then resumed. Transaction failures
/// are raised as a panic whose payload is the [`TransactionFailure`].
pub fn intercept<T>(
    manager: &dyn TransactionManager,
    method: &'static str,
    call: impl FnOnce() -> T,
) -> T {
    match run(manager, method, || Ok::<T, Infallible>(call())) {
        Ok(value) => value,
        Err(Abort::Failed(never)) => match never {},
        Err(Abort::Panicked(payload)) => panic::resume_unwind(payload),
        Err(Abort::Transaction(failure)) => panic::panic_any(failure),
    }
}

/// Runs a fallible method inside a transaction.
///
/// An `Err` returned by `call` is rolled back and then returned unchanged,
/// unless the rollback fails. Transaction failures are converted into `E`.
pub fn intercept_fallible<T, E>(
    manager: &dyn TransactionManager,
    method: &'static str,
    call: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<TransactionFailure> + Into<BoxError>,
{
    match run(manager, method, call) {
        Ok(value) => Ok(value),
        Err(Abort::Failed(err)) => Err(err),
        Err(Abort::Panicked(payload)) => panic::resume_unwind(payload),
        Err(Abort::Transaction(failure)) => Err(E::from(failure)),
    }
}

enum Abort<E> {
    Failed(E),
    Panicked(Box<dyn Any + Send>),
    Transaction(TransactionFailure),
}

impl<E: Into<BoxError>> Abort<E> {
    fn into_cause(self) -> BoxError {
        match self {
            Self::Failed(err) => err.into(),
            Self::Panicked(payload) => panic_message(payload.as_ref()).into(),
            Self::Transaction(failure) => Box::new(failure),
        }
    }
}

fn run<T, E>(
    manager: &dyn TransactionManager,
    method: &'static str,
    call: impl FnOnce() -> Result<T, E>,
) -> Result<T, Abort<E>>
where
    E: Into<BoxError>,
{
    if let Err(source) = manager.begin() {
        let failure = TransactionFailure::Begin { method, source };
        return Err(roll_back(manager, method, Abort::Transaction(failure)));
    }
    tracing::debug!(method, "began transaction");

    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => match manager.commit() {
            Ok(()) => {
                tracing::debug!(method, "committed transaction");
                Ok(value)
            }
            Err(source) => {
                let failure = TransactionFailure::Commit { method, source };
                Err(roll_back(manager, method, Abort::Transaction(failure)))
            }
        },
        Ok(Err(err)) => Err(roll_back(manager, method, Abort::Failed(err))),
        Err(payload) => Err(roll_back(manager, method, Abort::Panicked(payload))),
    }
}

fn roll_back<E>(manager: &dyn TransactionManager, method: &'static str, abort: Abort<E>) -> Abort<E>
where
    E: Into<BoxError>,
{
    match manager.rollback() {
        Ok(()) => {
            tracing::debug!(method, "rolled back transaction");
            abort
        }
        Err(source) => {
            tracing::warn!(method, error = %source, "could not roll back transaction");
            Abort::Transaction(TransactionFailure::Rollback {
                method,
                source,
                cause: Some(abort.into_cause()),
            })
        }
    }
}

/// The message carried by a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(failure) = payload.downcast_ref::<TransactionFailure>() {
        failure.to_string()
    } else {
        String::from("panicked without a message")
    }
}
