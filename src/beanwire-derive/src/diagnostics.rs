use std::fmt::{Display, Formatter, Result as FmtResult};

use proc_macro2::Span;
use syn::{Error as SynError, Result as SynResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodDefect {
    Static,
    ByValueReceiver,
    MutableReceiver,
    Async,
}

impl Display for MethodDefect {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let text = match self {
            Self::Static => "has no `self` receiver",
            Self::ByValueReceiver => "takes `self` by value",
            Self::MutableReceiver => "takes `&mut self` while the delegate is shared",
            Self::Async => "is `async`",
        };
        f.write_str(text)
    }
}

/// A build-time failure of one annotated type. Every variant points at the
/// offending tokens.
#[derive(Debug)]
pub enum ValidationError {
    InvalidShape {
        span: Span,
        reason: String,
    },
    MissingConstructor {
        span: Span,
        component: String,
    },
    TooManyConstructors {
        span: Span,
        component: String,
        constructors: Vec<String>,
    },
    UnresolvableDependency {
        span: Span,
        dependency: String,
        reason: &'static str,
    },
    UninterceptableMethod {
        span: Span,
        method: String,
        defect: MethodDefect,
    },
    UninterceptableType {
        span: Span,
        component: String,
        reason: &'static str,
    },
    InvalidHandler {
        span: Span,
        method: String,
        reason: String,
    },
}

impl ValidationError {
    pub fn span(&self) -> Span {
        match self {
            Self::InvalidShape { span, .. }
            | Self::MissingConstructor { span, .. }
            | Self::TooManyConstructors { span, .. }
            | Self::UnresolvableDependency { span, .. }
            | Self::UninterceptableMethod { span, .. }
            | Self::UninterceptableType { span, .. }
            | Self::InvalidHandler { span, .. } => *span,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::InvalidShape { reason, .. } => f.write_str(reason),
            Self::MissingConstructor { component, .. } => write!(
                f,
                "no associated function of `{component}` is annotated with `#[inject]`"
            ),
            Self::TooManyConstructors {
                component,
                constructors,
                ..
            } => write!(
                f,
                "only one associated function of `{component}` can be annotated with `#[inject]`, found {}: {}",
                constructors.len(),
                constructors.join("; "),
            ),
            Self::UnresolvableDependency {
                dependency, reason, ..
            } => write!(f, "cannot resolve the dependency `{dependency}`: {reason}"),
            Self::UninterceptableMethod { method, defect, .. } => {
                write!(f, "method `{method}` cannot be intercepted because it {defect}")
            }
            Self::UninterceptableType {
                component, reason, ..
            } => write!(f, "`{component}` cannot be intercepted: {reason}"),
            Self::InvalidHandler { method, reason, .. } => {
                write!(f, "`{method}` is not a valid request handler: {reason}")
            }
        }
    }
}

impl From<ValidationError> for SynError {
    fn from(err: ValidationError) -> Self {
        SynError::new(err.span(), err.to_string())
    }
}

/// Collects every validation failure of one macro invocation so that all
/// of them are reported at once.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<ValidationError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, err: ValidationError) {
        self.errors.push(err);
    }

    #[cfg(test)]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[cfg(test)]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    pub fn finish(self) -> SynResult<()> {
        let mut errors = self.errors.into_iter().map(SynError::from);
        match errors.next() {
            None => Ok(()),
            Some(mut first) => {
                errors.for_each(|err| first.combine(err));
                Err(first)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_lists_constructors() {
        let err = ValidationError::TooManyConstructors {
            span: Span::call_site(),
            component: "Service".into(),
            constructors: vec!["fn a () -> Self".into(), "fn b () -> Self".into()],
        };
        assert_eq!(
            err.to_string(),
            "only one associated function of `Service` can be annotated with `#[inject]`, found 2: fn a () -> Self; fn b () -> Self"
        );
    }

    #[test]
    fn diagnostics_finish_combines_every_error() {
        let mut diagnostics = Diagnostics::new();
        assert!(Diagnostics::new().finish().is_ok());

        diagnostics.report(ValidationError::UninterceptableMethod {
            span: Span::call_site(),
            method: "save".into(),
            defect: MethodDefect::Static,
        });
        diagnostics.report(ValidationError::UninterceptableType {
            span: Span::call_site(),
            component: "Repository".into(),
            reason: "generic implementations cannot be intercepted",
        });

        let err = diagnostics.finish().unwrap_err();
        let messages: Vec<_> = err.into_iter().map(|err| err.to_string()).collect();
        assert_eq!(
            messages,
            [
                "method `save` cannot be intercepted because it has no `self` receiver",
                "`Repository` cannot be intercepted: generic implementations cannot be intercepted",
            ]
        );
    }
}
