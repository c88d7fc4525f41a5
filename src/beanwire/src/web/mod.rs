mod dispatch;
mod message;

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::Serialize;
use snafu::prelude::*;

pub use dispatch::Dispatcher;
pub use message::{Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }

    /// Whether requests with this method carry a body.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            _ => {
                return UnknownMethodSnafu {
                    method: s.to_owned(),
                }
                .fail()
            }
        };
        Ok(method)
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("unknown HTTP method {method}"))]
pub struct UnknownMethod {
    method: String,
}

pub struct MediaType;

impl MediaType {
    pub const APPLICATION_JSON: &'static str = "application/json";
    pub const TEXT_PLAIN: &'static str = "text/plain";
}

/// What a handler produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A value to be serialized with the handler's media type.
    Value(serde_json::Value),
    /// A complete response, passed through as is.
    Response(Response),
}

impl Reply {
    pub fn value<T: Serialize + ?Sized>(value: &T) -> Result<Self, HandlerError> {
        serde_json::to_value(value)
            .context(SerializationSnafu)
            .map(Self::Value)
    }
}

/// A generated object binding one controller method to one route.
pub trait RequestHandler: Send + Sync {
    fn method(&self) -> HttpMethod;

    fn path(&self) -> &str;

    fn produces(&self) -> &str;

    /// Calls the controller method.
    ///
    /// # Errors
    ///
    /// Returns the controller method's error, or a serialization error of
    /// its result.
    fn process(&self, request: &Request) -> Result<Reply, HandlerError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum HandlerError {
    #[snafu(display("{source}"))]
    #[non_exhaustive]
    Failed { source: Box<dyn Error + Send + Sync> },
    #[snafu(display("could not serialize the reply"))]
    #[non_exhaustive]
    Serialization { source: serde_json::Error },
}

impl HandlerError {
    pub fn failed<E: Into<Box<dyn Error + Send + Sync>>>(err: E) -> Self {
        Self::Failed { source: err.into() }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn http_method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");

        let err = "FETCH".parse::<HttpMethod>().unwrap_err();
        assert_eq!(err.to_string(), "unknown HTTP method FETCH");
    }

    #[test]
    fn http_method_has_body_only_for_writes() {
        assert!(HttpMethod::Post.has_body());
        assert!(HttpMethod::Put.has_body());
        assert!(HttpMethod::Patch.has_body());
        assert!(!HttpMethod::Get.has_body());
        assert!(!HttpMethod::Delete.has_body());
    }

    #[test]
    fn reply_value_serializes() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        assert_eq!(Reply::value(&42).unwrap(), Reply::Value(json!(42)));
        assert_eq!(
            Reply::value(&Point { x: 1, y: 2 }).unwrap(),
            Reply::Value(json!({ "x": 1, "y": 2 }))
        );
    }

    #[test]
    fn handler_error_failed_keeps_message() {
        let err = HandlerError::failed("user not found");
        assert_eq!(err.to_string(), "user not found");
    }
}
