use thiserror::Error;

use crate::client::ApiError;

/// Why a refresh exchange did not produce a new pair. Callers never see this;
/// it is logged and turned into [`ApiError::Unauthorized`] or a retry.
#[derive(Debug, Error, Clone)]
pub(crate) enum RefreshError {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh exchange failed: {0}")]
    Exchange(#[from] ApiError),
}

impl RefreshError {
    pub(crate) fn log(self) -> Self {
        match &self {
            Self::MissingRefreshToken => tracing::info!("No refresh token available"),
            Self::Exchange(err) => tracing::warn!("Refresh exchange failed: {}", err),
        }
        self
    }
}
