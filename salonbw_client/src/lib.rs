//! salonbw_client - Authenticated API client for the salonbw panel
//!
//! Every call the panel makes to its API goes through one [`SessionController`].
//! The controller owns the credential pair ([`TokenStore`]), sends requests with
//! the bearer token attached, and on a 401 runs a single-flight refresh-token
//! exchange before retrying the request once. When refreshing cannot save the
//! session, it is logged out everywhere and the caller gets
//! [`ApiError::Unauthorized`].
//!
//! ```no_run
//! use salonbw_client::{ClientConfig, RequestOptions, SessionController};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionController::new(ClientConfig::from_env())?;
//! session.wait_until_initialized().await;
//!
//! if !session.is_authenticated() {
//!     session.login("a@b.com", "secret").await?;
//! }
//!
//! let customers: serde_json::Value = session
//!     .request("/customers", RequestOptions::get().query("page", 1))
//!     .await?
//!     .into_json()?;
//! println!("{customers}");
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod refresh;
mod session;
mod storage;
mod utils;

pub use client::{
    ApiClient, ApiError, ApiRequest, CorrelationHeader, CsrfHeader, HeaderInjector, Payload,
    RequestOptions, SKIP_LOGOUT_HEADER, SessionExpiryHandler,
};

pub use config::{
    ClientConfig, SALONBW_API_URL, SALONBW_COOKIE_DOMAIN, SALONBW_DEBUG_API,
    SALONBW_LOGOUT_TIMEOUT_SECS, SALONBW_REQUEST_TIMEOUT_SECS, SALONBW_SITE_URL,
    SALONBW_TOKEN_FILE,
};

pub use refresh::{RefreshCoordinator, RefreshState};

pub use session::{
    LogoutReason, Navigator, RecordingNavigator, RegisterData, Role, SessionController,
    SessionControllerBuilder, SessionError, SessionEvent, SessionState, TracingNavigator, User,
};

pub use storage::{
    ACCESS_TOKEN_KEY, CookieJar, CookieScope, CredentialPair, DEBUG_API_KEY, DurableStore,
    FileStore, InMemoryStore, REFRESH_TOKEN_KEY, StorageError, TokenStore,
};

pub use utils::UtilError;
