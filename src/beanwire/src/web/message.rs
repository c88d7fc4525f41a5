use serde::de::DeserializeOwned;

use crate::web::HttpMethod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: HttpMethod,
    path: String,
    body: Option<String>,
}

impl Request {
    /// Creates a request. The body is dropped unless the method carries one
    /// (`POST`, `PUT` or `PATCH`).
    pub fn new(method: HttpMethod, path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: body.filter(|_| method.has_body()),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, None)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Deserializes the JSON body, if there is one.
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.body.as_deref().map(serde_json::from_str).transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    content_type: Option<String>,
    body: Option<String>,
}

impl Response {
    pub const OK: u16 = 200;
    pub const NO_CONTENT: u16 = 204;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;

    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: None,
        }
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = Some(body.into());
        self
    }

    pub fn no_content() -> Self {
        Self::new(Self::NO_CONTENT)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}
