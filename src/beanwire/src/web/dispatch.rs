use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::provider::{BeanProvider, LookupError, TypedBeanProvider};
use crate::transaction;
use crate::web::{HttpMethod, MediaType, Reply, Request, RequestHandler, Response};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error_message: &'a str,
}

/// Routes requests to the handler registered for their method and path.
///
/// The dispatcher is the in-process half of an HTTP transport: it renders
/// handler replies into responses, turns handler failures and panics into
/// `500` responses with a `{"errorMessage": ...}` body, and answers `404`
/// when no handler matches.
pub struct Dispatcher {
    handlers: Vec<Arc<dyn RequestHandler>>,
}

impl Dispatcher {
    pub fn new(handlers: Vec<Arc<dyn RequestHandler>>) -> Self {
        Self { handlers }
    }

    /// Collects every [`RequestHandler`] visible in `provider`.
    pub fn from_provider(provider: &dyn BeanProvider) -> Result<Self, LookupError> {
        provider.provide_all::<dyn RequestHandler>().map(Self::new)
    }

    pub fn handlers(&self) -> &[Arc<dyn RequestHandler>] {
        &self.handlers
    }

    pub fn route(&self, method: HttpMethod, path: &str) -> Option<&Arc<dyn RequestHandler>> {
        self.handlers
            .iter()
            .find(|handler| handler.method() == method && handler.path() == path)
    }

    pub fn dispatch(&self, request: &Request) -> Response {
        let Some(handler) = self.route(request.method(), request.path()) else {
            tracing::debug!(method = %request.method(), path = request.path(), "no route matched");
            return Response::new(Response::NOT_FOUND);
        };

        tracing::debug!(method = %request.method(), path = request.path(), "dispatching request");
        let message = match panic::catch_unwind(AssertUnwindSafe(|| handler.process(request))) {
            Ok(Ok(Reply::Response(response))) => return response,
            Ok(Ok(Reply::Value(value))) => {
                let body = match value {
                    Value::String(text) => text,
                    value => value.to_string(),
                };
                return Response::new(Response::OK).with_body(handler.produces(), body);
            }
            Ok(Err(err)) => err.to_string(),
            Err(payload) => transaction::panic_message(payload.as_ref()),
        };

        tracing::warn!(
            method = %request.method(),
            path = request.path(),
            error = %message,
            "request handler failed"
        );
        error_response(&message)
    }
}

fn error_response(message: &str) -> Response {
    let body = serde_json::to_string(&ErrorBody {
        error_message: message,
    })
    .unwrap_or_default();
    Response::new(Response::INTERNAL_SERVER_ERROR).with_body(MediaType::APPLICATION_JSON, body)
}
