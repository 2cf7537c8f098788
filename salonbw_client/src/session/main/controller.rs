use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use super::builder::SessionControllerBuilder;
use super::logout::run_logout;
use super::profile::fetch_profile;
use crate::client::{ApiClient, ApiError, ApiRequest, Payload, RequestOptions, SessionExpiryHandler};
use crate::config::{ClientConfig, LOGIN_PATH, REGISTER_PATH};
use crate::session::errors::SessionError;
use crate::session::navigator::Navigator;
use crate::session::types::{LogoutReason, RegisterData, Role, SessionEvent, SessionState, User};
use crate::storage::CredentialPair;

#[derive(Debug, Default)]
struct Profile {
    user: Option<User>,
    is_authenticated: bool,
}

pub(crate) struct SessionInner {
    pub(super) config: ClientConfig,
    pub(super) client: ApiClient,
    /// URL the CSRF cookie is read back for.
    api_url: Url,
    profile: RwLock<Profile>,
    initialized: watch::Sender<bool>,
    pub(super) events: broadcast::Sender<SessionEvent>,
    pub(super) navigator: Arc<dyn Navigator>,
    pub(super) logout_lock: Mutex<()>,
}

impl SessionInner {
    pub(super) fn new(
        config: ClientConfig,
        client: ApiClient,
        api_url: Url,
        events: broadcast::Sender<SessionEvent>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (initialized, _) = watch::channel(false);
        Self {
            config,
            client,
            api_url,
            profile: RwLock::new(Profile::default()),
            initialized,
            events,
            navigator,
            logout_lock: Mutex::new(()),
        }
    }

    fn read_profile(&self) -> RwLockReadGuard<'_, Profile> {
        self.profile.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_profile(&self) -> RwLockWriteGuard<'_, Profile> {
        self.profile.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn capture_csrf(&self) {
        if self.client.csrf().capture(&self.api_url).is_some() {
            tracing::debug!("Captured CSRF token");
        }
    }

    fn apply_profile(&self, user: User) {
        let mut profile = self.write_profile();
        profile.user = Some(user);
        profile.is_authenticated = true;
    }

    /// Fetches the profile; on failure the local session is cleared, without a redirect.
    async fn load_profile(&self) -> Result<User, ApiError> {
        match fetch_profile(&self.client).await {
            Ok(user) => {
                self.apply_profile(user.clone());
                Ok(user)
            }
            Err(e) => {
                tracing::debug!("Profile fetch failed: {}", e);
                self.clear_local().await;
                Err(e)
            }
        }
    }

    /// Drops user, credentials and CSRF token. `initialized` is left alone.
    pub(super) async fn clear_local(&self) {
        *self.write_profile() = Profile::default();
        self.client.clear_credentials().await;
    }

    pub(super) async fn bootstrap(&self) {
        match self.load_profile().await {
            Ok(user) => tracing::info!(user_id = user.id, "Session restored"),
            Err(_) => tracing::info!("No active session"),
        }
        self.initialized.send_replace(true);
    }
}

/// Bridges terminal 401s from the client back to the session that owns it.
pub(super) struct ExpiryBridge(pub(super) Weak<SessionInner>);

#[async_trait]
impl SessionExpiryHandler for ExpiryBridge {
    async fn session_expired(&self) {
        if let Some(inner) = self.0.upgrade() {
            run_logout(inner, LogoutReason::SessionExpired).await;
        }
    }
}

/// Caller-facing session: login, logout, refresh and the authenticated
/// [`request`](Self::request) every other part of the app goes through.
///
/// Cloning is cheap; clones share one session.
#[derive(Clone)]
pub struct SessionController {
    pub(super) inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn builder(config: ClientConfig) -> SessionControllerBuilder {
        SessionControllerBuilder::new(config)
    }

    /// Controller with in-memory storage and the logging navigator.
    pub fn new(config: ClientConfig) -> Result<Self, SessionError> {
        Self::builder(config).build()
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        let profile = self.inner.read_profile();
        SessionState {
            role: profile.user.as_ref().map(|u| u.role),
            user: profile.user.clone(),
            initialized: self.is_initialized(),
            is_authenticated: profile.is_authenticated,
        }
    }

    pub fn user(&self) -> Option<User> {
        self.inner.read_profile().user.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.read_profile().user.as_ref().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read_profile().is_authenticated
    }

    pub fn is_initialized(&self) -> bool {
        *self.inner.initialized.borrow()
    }

    /// Resolves once the bootstrap profile fetch has finished.
    pub async fn wait_until_initialized(&self) {
        let mut initialized = self.inner.initialized.subscribe();
        // The sender lives as long as `self`
        let _ = initialized.wait_for(|done| *done).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        let options = RequestOptions::post().json(&json!({ "email": email, "password": password }))?;

        let pair: CredentialPair = self
            .inner
            .client
            .execute_without_refresh(LOGIN_PATH, options)
            .await
            .and_then(Payload::into_json)
            .map_err(|e| SessionError::login_failed(&e).log())?;

        self.inner.client.tokens().write(Some(pair));
        self.inner.capture_csrf();

        let user = self
            .inner
            .load_profile()
            .await
            .map_err(|e| SessionError::login_failed(&e).log())?;

        tracing::info!(user_id = user.id, role = %user.role, "Logged in");
        let _ = self.inner.events.send(SessionEvent::LoggedIn {
            user_id: user.id,
            role: user.role,
        });
        Ok(())
    }

    #[tracing::instrument(skip(self, data), fields(email = %data.email))]
    pub async fn register(&self, data: RegisterData) -> Result<(), SessionError> {
        let options = RequestOptions::post().json(&data)?;

        self.inner
            .client
            .execute_without_refresh::<serde_json::Value>(REGISTER_PATH, options)
            .await
            .map_err(|e| SessionError::registration_failed(&e).log())?;

        tracing::info!("Registered, logging in");
        self.login(&data.email, &data.password).await
    }

    /// Exchanges the refresh token now. On failure the session is logged out
    /// and the error returned.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), SessionError> {
        if let Err(e) = self.inner.client.refresh_now().await {
            run_logout(self.inner.clone(), LogoutReason::RefreshFailed).await;
            return Err(SessionError::RefreshFailed(e.to_string()).log());
        }

        self.inner.capture_csrf();
        if let Err(e) = self.inner.load_profile().await {
            run_logout(self.inner.clone(), LogoutReason::RefreshFailed).await;
            return Err(SessionError::RefreshFailed(e.to_string()).log());
        }
        Ok(())
    }

    /// Ends the session: best-effort server call, then local state, tokens and
    /// CSRF token are cleared and the navigator sent to the site URL. Safe to
    /// call any number of times, concurrently or not.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) {
        run_logout(self.inner.clone(), LogoutReason::UserRequested).await;
    }

    /// The entry point for every other API call in the app.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Payload<T>, ApiError> {
        self.inner.client.request(endpoint, options).await
    }

    pub async fn request_typed<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Payload<T>, ApiError> {
        self.inner.client.request_typed(request).await
    }

    /// Logs this session out whenever `peer` logs out on its own account.
    /// Logouts received this way are announced as [`LogoutReason::Propagated`]
    /// and are not passed on again.
    pub fn link_logout(&self, peer: &SessionController) -> JoinHandle<()> {
        let mut peer_events = peer.subscribe();
        let this = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                match peer_events.recv().await {
                    Ok(SessionEvent::LoggedOut { reason }) if reason != LogoutReason::Propagated => {
                        let Some(inner) = this.upgrade() else {
                            break;
                        };
                        run_logout(inner, LogoutReason::Propagated).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Missed {} session events from linked session", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("client", &self.inner.client)
            .finish()
    }
}
