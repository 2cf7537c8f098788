use thiserror::Error;

use crate::utils::UtilError;

/// Errors returned to anything calling through [`ApiClient`](super::ApiClient).
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// No response was received (DNS, connection, timeout). The detail is only logged.
    #[error("Network error")]
    Network(String),

    /// Non-2xx response with the best message that could be extracted from it.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A 401 that could not be resolved by refreshing the credentials.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),

    /// A JSON body was required but the response carried none.
    #[error("Expected a JSON response body")]
    UnexpectedPayload,

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Message extracted from the server response, when there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::Network(detail) => tracing::error!("Network error: {}", detail),
            Self::Http { status, message } => tracing::error!("HTTP {}: {}", status, message),
            Self::Unauthorized => tracing::error!("Unauthorized"),
            Self::InvalidRequest(msg) => tracing::error!("Invalid request: {}", msg),
            Self::Serde(msg) => tracing::error!("Json conversion error: {}", msg),
            Self::UnexpectedPayload => tracing::error!("Expected a JSON response body"),
            Self::Utils(err) => tracing::error!("Utils error: {}", err),
        }
        self
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
