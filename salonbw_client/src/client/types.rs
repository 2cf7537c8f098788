use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::Serialize;

use super::errors::ApiError;
use crate::utils::{header_name, header_value};

/// Header a caller can set to keep a 401 from logging the session out.
/// It is stripped before the request leaves the client.
pub const SKIP_LOGOUT_HEADER: &str = "x-skip-logout";

/// Receives the terminal "refresh could not save this session" signal.
///
/// The session controller implements it to tear the session down; the client
/// awaits it before returning [`ApiError::Unauthorized`].
#[async_trait]
pub trait SessionExpiryHandler: Send + Sync + 'static {
    async fn session_expired(&self);
}

/// Per-call settings, the counterpart of a fetch `RequestInit`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub query: Vec<(String, String)>,
    /// A 401 this request cannot recover from does not end the session.
    pub skip_logout: bool,
    /// Overrides the client-wide request timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Serializes `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    /// Raw request body. Without an explicit content type it is sent as JSON.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        self.headers.insert(header_name(name)?, header_value(value)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn skip_logout(mut self) -> Self {
        self.skip_logout = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn has_content_type(&self) -> bool {
        self.headers.contains_key(CONTENT_TYPE)
    }

    /// Folds the `x-skip-logout` header into the flag and removes the header.
    pub(crate) fn take_skip_logout(&mut self) -> bool {
        let from_header = self.headers.remove(SKIP_LOGOUT_HEADER).is_some();
        self.skip_logout = self.skip_logout || from_header;
        self.skip_logout
    }
}

/// Normalized response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// 204, an empty body, or a content type the client does not decode.
    NoContent,
    Json(T),
    Text(String),
}

impl<T> Payload<T> {
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    pub fn json(self) -> Option<T> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The decoded JSON body, or [`ApiError::UnexpectedPayload`] for anything else.
    pub fn into_json(self) -> Result<T, ApiError> {
        self.json().ok_or(ApiError::UnexpectedPayload)
    }
}

/// A request described by method, path template and parameters.
///
/// ```
/// use salonbw_client::ApiRequest;
///
/// let request = ApiRequest::get("/customers/{id}/notes")
///     .path_param("id", 42)
///     .query("page", 2);
/// assert_eq!(request.endpoint(), "/customers/42/notes");
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    path: String,
    path_params: Vec<(String, String)>,
    options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            path_params: Vec::new(),
            options: RequestOptions::new(method),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.path_params.push((name.into(), value.to_string()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.options = self.options.query(key, value);
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.options = self.options.json(body)?;
        Ok(self)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        self.options = self.options.header(name, value)?;
        Ok(self)
    }

    /// Path with every `{name}` placeholder replaced by its percent-encoded value.
    pub fn endpoint(&self) -> String {
        self.path_params
            .iter()
            .fold(self.path.clone(), |path, (name, value)| {
                path.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
            })
    }

    pub(crate) fn into_parts(self) -> (String, RequestOptions) {
        let endpoint = self.endpoint();
        (endpoint, self.options)
    }
}
