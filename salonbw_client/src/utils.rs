use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

/// Generates a value for the `X-Request-Id` header.
pub(crate) fn gen_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn header_value(value: &str) -> Result<HeaderValue, UtilError> {
    HeaderValue::from_str(value)
        .map_err(|_| UtilError::Header(format!("Invalid header value for {value:?}")))
}

pub(crate) fn header_name(name: &str) -> Result<HeaderName, UtilError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| UtilError::Header(format!("Invalid header name: {name}")))
}

/// Reads a header as UTF-8, ignoring values that are not.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Header error: {0}")]
    Header(String),
}
