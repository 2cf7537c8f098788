use serde::{Deserialize, Serialize};

/// Durable-store key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "jwtToken";
/// Durable-store key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Durable-store key of the local debug toggle (`"1"` enables it).
pub const DEBUG_API_KEY: &str = "DEBUG_API";

pub(crate) const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub(crate) const REFRESH_TOKEN_COOKIE: &str = "refreshToken";
/// Presence-only marker read by edge checks.
pub(crate) const AUTH_MARKER_COOKIE: &str = "sbw_auth";
pub(crate) const LEGACY_TOKEN_COOKIE: &str = "token";

/// Access/refresh token pair issued by login, register and refresh.
///
/// The server has returned both `accessToken` and `access_token` spellings over
/// time, so both are accepted when deserializing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens stay out of logs
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Where credential cookies are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieScope {
    /// Host the cookie belongs to when it is host-only.
    pub host: String,
    /// `Some(".salon-bw.pl")` shares the cookie with every subdomain.
    pub domain: Option<String>,
    pub path: String,
}

impl CookieScope {
    pub fn host_only(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            domain: None,
            path: "/".to_string(),
        }
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }
}
