use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::broadcast;

use super::executor::RequestExecutor;
use super::headers::CsrfHeader;
use super::response::read_payload;
use crate::client::errors::ApiError;
use crate::client::types::{ApiRequest, Payload, RequestOptions, SessionExpiryHandler};
use crate::config::REFRESH_PATH;
use crate::refresh::{RefreshCoordinator, RefreshError, RefreshOutcome};
use crate::session::SessionEvent;
use crate::storage::{CredentialPair, TokenStore};

/// Authenticated client shared by everything that talks to the API.
///
/// A 401 from any endpoint but `/auth/refresh` goes through the
/// [`RefreshCoordinator`]: the request is retried once with the renewed access
/// token, or the session is expired and [`ApiError::Unauthorized`] returned.
pub struct ApiClient {
    executor: RequestExecutor,
    tokens: Arc<TokenStore>,
    coordinator: RefreshCoordinator,
    csrf: Arc<CsrfHeader>,
    expiry: Arc<dyn SessionExpiryHandler>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub(crate) fn new(
        executor: RequestExecutor,
        tokens: Arc<TokenStore>,
        csrf: Arc<CsrfHeader>,
        expiry: Arc<dyn SessionExpiryHandler>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            executor,
            tokens,
            coordinator: RefreshCoordinator::new(),
            csrf,
            expiry,
            events,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }

    pub(crate) fn csrf(&self) -> &CsrfHeader {
        &self.csrf
    }

    /// Sends a request with the stored credentials, refreshing them once on a 401.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Payload<T>, ApiError> {
        self.execute(endpoint, options, true).await
    }

    pub async fn request_typed<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Payload<T>, ApiError> {
        let (endpoint, options) = request.into_parts();
        self.request(&endpoint, options).await
    }

    /// Path used by the auth endpoints themselves: a 401 is just an error.
    pub(crate) async fn execute_without_refresh<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Payload<T>, ApiError> {
        self.execute(endpoint, options, false).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        mut options: RequestOptions,
        allow_refresh: bool,
    ) -> Result<Payload<T>, ApiError> {
        let skip_logout = options.take_skip_logout();
        let url = self.executor.url_for(endpoint, &options.query)?;
        let generation = self.coordinator.generation();
        let sent_token = self.tokens.read_access_token();

        let response = self
            .executor
            .send(&url, &options, sent_token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || !allow_refresh
            || self.executor.targets(&url, REFRESH_PATH)
        {
            return read_payload(response, self.executor.debug()).await;
        }
        drop(response);

        tracing::debug!("401 from {}, resolving through refresh", url.path());

        match self
            .coordinator
            .resolve(sent_token, generation, || self.exchange_refresh_token())
            .await
        {
            RefreshOutcome::Renewed(pair) => {
                // Logout may have run between the exchange and this retry.
                let current = self
                    .tokens
                    .read_access_token()
                    .filter(|_| self.coordinator.generation() == generation);
                let Some(token) = current else {
                    tracing::debug!("Session cleared before retrying {}", url.path());
                    return Err(ApiError::Unauthorized);
                };
                if token != pair.access_token {
                    tracing::debug!("Access token rotated again before retrying {}", url.path());
                }

                let retried = self.executor.send(&url, &options, Some(&token)).await?;
                if self.coordinator.generation() != generation {
                    tracing::debug!("Session cleared while retrying {}", url.path());
                    return Err(ApiError::Unauthorized);
                }
                read_payload(retried, self.executor.debug()).await
            }
            RefreshOutcome::Superseded => {
                tracing::debug!("Session cleared while {} was pending", url.path());
                Err(ApiError::Unauthorized)
            }
            RefreshOutcome::Failed => {
                if skip_logout {
                    tracing::debug!("Refresh failed for {}, logout skipped", url.path());
                } else {
                    self.expiry.session_expired().await;
                }
                Err(ApiError::Unauthorized)
            }
        }
    }

    /// Manual refresh, serialized with the reactive path.
    pub(crate) async fn refresh_now(&self) -> Result<CredentialPair, RefreshError> {
        let replaced = self.tokens.read_access_token();
        self.coordinator
            .exchange_now(replaced, || self.exchange_refresh_token())
            .await
    }

    /// `POST /auth/refresh`. Only ever called under the coordinator's gate.
    async fn exchange_refresh_token(&self) -> Result<CredentialPair, RefreshError> {
        let Some(refresh_token) = self.tokens.read_refresh_token() else {
            return Err(RefreshError::MissingRefreshToken);
        };

        let options = RequestOptions::post().json(&json!({ "refreshToken": refresh_token }))?;
        let url = self.executor.url_for(REFRESH_PATH, &[])?;
        let response = self.executor.send(&url, &options, None).await?;
        let pair: CredentialPair = read_payload(response, self.executor.debug())
            .await?
            .into_json()?;

        self.tokens.write(Some(pair.clone()));
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::TokensRefreshed);
        tracing::info!("Access token refreshed");
        Ok(pair)
    }

    /// Removes every copy of the credentials and the captured CSRF token.
    pub(crate) async fn clear_credentials(&self) {
        self.coordinator
            .reset_with(|| {
                self.tokens.write(None);
                self.csrf.clear();
            })
            .await;
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("executor", &self.executor)
            .field("tokens", &self.tokens)
            .field("refresh_state", &self.coordinator.state())
            .finish()
    }
}
