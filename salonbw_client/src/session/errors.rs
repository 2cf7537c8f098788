use thiserror::Error;

use crate::client::ApiError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// Login or the profile fetch right after it failed. `message` is the
    /// server's message when it sent one, "Login failed" otherwise.
    #[error("{message}")]
    LoginFailed { status: Option<u16>, message: String },

    #[error("{message}")]
    RegistrationFailed { status: Option<u16>, message: String },

    /// A manual refresh failed; the session has been logged out.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Session setup error: {0}")]
    Setup(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    pub(crate) fn login_failed(error: &ApiError) -> Self {
        Self::LoginFailed {
            status: error.status(),
            message: error.server_message().unwrap_or("Login failed").to_string(),
        }
    }

    pub(crate) fn registration_failed(error: &ApiError) -> Self {
        Self::RegistrationFailed {
            status: error.status(),
            message: error
                .server_message()
                .unwrap_or("Registration failed")
                .to_string(),
        }
    }

    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::LoginFailed { status, message } => {
                tracing::warn!("Login failed ({:?}): {}", status, message)
            }
            Self::RegistrationFailed { status, message } => {
                tracing::warn!("Registration failed ({:?}): {}", status, message)
            }
            Self::RefreshFailed(msg) => tracing::error!("Session refresh failed: {}", msg),
            Self::Setup(msg) => tracing::error!("Session setup error: {}", msg),
            Self::Api(err) => tracing::error!("API error: {}", err),
        }
        self
    }
}
