//! Central configuration for the salonbw_client crate
//!
//! Environment variables are read once through the statics below. Runtime code only
//! ever sees a [`ClientConfig`] value handed over at construction.

use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// Base URL the panel API is served from.
/// Default: "http://localhost:3000"
pub static SALONBW_API_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("SALONBW_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
});

/// Public entry point users are sent to after logout.
pub static SALONBW_SITE_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("SALONBW_SITE_URL").unwrap_or_else(|_| "https://dev.salon-bw.pl".to_string())
});

pub static SALONBW_DEBUG_API: LazyLock<bool> = LazyLock::new(|| {
    env::var("SALONBW_DEBUG_API")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

pub static SALONBW_COOKIE_DOMAIN: LazyLock<Option<String>> = LazyLock::new(|| {
    env::var("SALONBW_COOKIE_DOMAIN")
        .ok()
        .filter(|v| !v.trim().is_empty())
});

pub static SALONBW_LOGOUT_TIMEOUT_SECS: LazyLock<u64> = LazyLock::new(|| {
    env::var("SALONBW_LOGOUT_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5)
});

pub static SALONBW_REQUEST_TIMEOUT_SECS: LazyLock<u64> = LazyLock::new(|| {
    env::var("SALONBW_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30) // Same budget as the other outbound clients
});

pub static SALONBW_TOKEN_FILE: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| env::var("SALONBW_TOKEN_FILE").ok().map(PathBuf::from));

pub(crate) const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Parent domain whose subdomains (landing, panel, api) share auth cookies.
pub(crate) const SHARED_COOKIE_DOMAIN: &str = "salon-bw.pl";

pub(crate) const LOGIN_PATH: &str = "/auth/login";
pub(crate) const REGISTER_PATH: &str = "/auth/register";
pub(crate) const REFRESH_PATH: &str = "/auth/refresh";
pub(crate) const LOGOUT_PATH: &str = "/auth/logout";
pub(crate) const PROFILE_PATH: &str = "/users/profile";

/// Settings for one session. Build it with [`ClientConfig::from_env`] or
/// [`ClientConfig::new`] and adjust the public fields as needed.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub site_url: String,
    /// Enables correlation-id logging and `X-Request-Id` generation.
    pub debug: bool,
    /// Domain written on credential cookies; `None` means host-only.
    pub cookie_domain: Option<String>,
    pub logout_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        let site_url = SALONBW_SITE_URL.clone();
        Self {
            api_url: api_url.into(),
            cookie_domain: derive_cookie_domain(&site_url),
            site_url,
            debug: false,
            logout_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env() -> Self {
        let site_url = SALONBW_SITE_URL.clone();
        let cookie_domain = SALONBW_COOKIE_DOMAIN
            .clone()
            .or_else(|| derive_cookie_domain(&site_url));

        Self {
            api_url: SALONBW_API_URL.clone(),
            site_url,
            debug: *SALONBW_DEBUG_API,
            cookie_domain,
            logout_timeout: Duration::from_secs(*SALONBW_LOGOUT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(*SALONBW_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = site_url.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_cookie_domain(mut self, domain: Option<String>) -> Self {
        self.cookie_domain = domain;
        self
    }

    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Credential cookies are scoped to the parent domain when the site runs under it,
/// so every subdomain app sees the same session.
pub(crate) fn derive_cookie_domain(site_url: &str) -> Option<String> {
    let host = url::Url::parse(site_url).ok()?.host_str()?.to_string();
    if host == SHARED_COOKIE_DOMAIN || host.ends_with(&format!(".{SHARED_COOKIE_DOMAIN}")) {
        Some(format!(".{SHARED_COOKIE_DOMAIN}"))
    } else {
        None
    }
}
