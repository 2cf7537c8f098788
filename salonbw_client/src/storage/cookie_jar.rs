//! Browser-like cookie store shared by the token store and the HTTP client.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::Url;
use reqwest::header::HeaderValue;

use super::errors::StorageError;
use super::types::CookieScope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredCookie {
    pub(crate) name: String,
    pub(crate) value: String,
    /// Domain (without leading dot) or exact host for host-only cookies.
    pub(crate) host: String,
    pub(crate) host_only: bool,
    pub(crate) path: String,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) secure: bool,
    pub(crate) http_only: bool,
}

impl StoredCookie {
    fn same_identity(&self, other: &StoredCookie) -> bool {
        self.name == other.name
            && self.host == other.host
            && self.host_only == other.host_only
            && self.path == other.path
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn matches(&self, url: &Url, now: DateTime<Utc>) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let host_ok = if self.host_only {
            host == self.host
        } else {
            domain_matches(&host, &self.host)
        };

        host_ok
            && path_matches(url.path(), &self.path)
            && (!self.secure || url.scheme() == "https" || is_loopback(&host))
            && !self.is_expired(now)
    }
}

/// Cookie jar holding both server-issued cookies and the credential cookies
/// written by [`TokenStore`](super::TokenStore).
///
/// Implements [`reqwest::cookie::CookieStore`], so the same jar is what the HTTP
/// client reads from and writes to on every request.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the Vec half-updated, so recover the guard.
    fn read_cookies(&self) -> RwLockReadGuard<'_, Vec<StoredCookie>> {
        self.cookies.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cookies(&self) -> RwLockWriteGuard<'_, Vec<StoredCookie>> {
        self.cookies.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Writes a session cookie the way client-side script would.
    pub fn set(&self, name: &str, value: &str, scope: &CookieScope) {
        let cookie = scoped_cookie(name, value, scope);
        let mut cookies = self.write_cookies();
        cookies.retain(|c| !c.same_identity(&cookie));
        cookies.push(cookie);
    }

    pub fn remove(&self, name: &str, scope: &CookieScope) {
        let target = scoped_cookie(name, "", scope);
        self.write_cookies().retain(|c| !c.same_identity(&target));
    }

    /// Value of `name` as it would be sent to `url`.
    pub fn get(&self, name: &str, url: &Url) -> Option<String> {
        let now = Utc::now();
        self.read_cookies()
            .iter()
            .filter(|c| c.name == name && c.matches(url, now))
            .max_by_key(|c| c.path.len())
            .map(|c| c.value.clone())
    }

    /// Stores one `Set-Cookie` header received from `url`.
    pub fn store_set_cookie(&self, header: &str, url: &Url) -> Result<(), StorageError> {
        let now = Utc::now();
        let cookie = parse_set_cookie(header, url, now)?;

        let mut cookies = self.write_cookies();
        cookies.retain(|c| !c.same_identity(&cookie) && !c.is_expired(now));
        if cookie.is_expired(now) {
            tracing::debug!("Server expired cookie {}", cookie.name);
        } else {
            tracing::debug!("Stored cookie {} for {}", cookie.name, cookie.host);
            cookies.push(cookie);
        }
        Ok(())
    }

    /// `Cookie` header value for a request to `url`.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let now = Utc::now();
        let cookies = self.read_cookies();
        let mut matching: Vec<&StoredCookie> =
            cookies.iter().filter(|c| c.matches(url, now)).collect();
        if matching.is_empty() {
            return None;
        }
        // Longer paths first
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn clear(&self) {
        self.write_cookies().clear();
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                tracing::warn!("Ignoring non UTF-8 Set-Cookie header from {url}");
                continue;
            };
            if let Err(e) = self.store_set_cookie(raw, url) {
                tracing::warn!("Ignoring Set-Cookie from {url}: {e}");
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self.header_for(url)?;
        HeaderValue::from_str(&header).ok()
    }
}

fn scoped_cookie(name: &str, value: &str, scope: &CookieScope) -> StoredCookie {
    let (host, host_only) = match &scope.domain {
        Some(domain) => (domain.trim_start_matches('.').to_ascii_lowercase(), false),
        None => (scope.host.to_ascii_lowercase(), true),
    };
    StoredCookie {
        name: name.to_string(),
        value: value.to_string(),
        host,
        host_only,
        path: scope.path.clone(),
        expires_at: None,
        secure: false,
        http_only: false,
    }
}

pub(crate) fn parse_set_cookie(
    header: &str,
    url: &Url,
    now: DateTime<Utc>,
) -> Result<StoredCookie, StorageError> {
    let request_host = url
        .host_str()
        .ok_or_else(|| StorageError::Cookie(format!("No host in {url}")))?
        .to_ascii_lowercase();

    let mut parts = header.split(';');
    let (name, value) = parts
        .next()
        .and_then(|pair| pair.split_once('='))
        .ok_or_else(|| StorageError::Cookie("Missing cookie name/value pair".to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::Cookie("Empty cookie name".to_string()));
    }

    let mut cookie = StoredCookie {
        name: name.to_string(),
        value: value.trim().trim_matches('"').to_string(),
        host: request_host.clone(),
        host_only: true,
        path: default_path(url.path()),
        expires_at: None,
        secure: false,
        http_only: false,
    };
    let mut max_age_seen = false;

    for attr in parts {
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim()),
            None => (attr.trim().to_ascii_lowercase(), ""),
        };

        match key.as_str() {
            "domain" => {
                let domain = val.trim_start_matches('.').to_ascii_lowercase();
                if domain.is_empty() {
                    continue;
                }
                if !domain_matches(&request_host, &domain) {
                    return Err(StorageError::Cookie(format!(
                        "Domain {domain} does not match {request_host}"
                    )));
                }
                cookie.host = domain;
                cookie.host_only = false;
            }
            "path" if val.starts_with('/') => cookie.path = val.to_string(),
            "max-age" => {
                if let Ok(secs) = val.parse::<i64>() {
                    max_age_seen = true;
                    cookie.expires_at = Some(expiry_after(now, secs));
                }
            }
            "expires" if !max_age_seen => {
                // Unparseable dates leave a session cookie
                if let Some(at) = parse_cookie_date(val) {
                    cookie.expires_at = Some(at.min(now + max_cookie_lifetime()));
                }
            }
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            _ => {}
        }
    }

    Ok(cookie)
}

/// Upper bound on any cookie lifetime (400 days, as browsers cap it).
const MAX_COOKIE_LIFETIME_DAYS: i64 = 400;

fn max_cookie_lifetime() -> Duration {
    Duration::days(MAX_COOKIE_LIFETIME_DAYS)
}

/// Expiry for a `Max-Age` of `secs`; non-positive values expire immediately.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    if secs <= 0 {
        return now - Duration::seconds(1);
    }
    let lifetime = Duration::try_seconds(secs)
        .unwrap_or_else(max_cookie_lifetime)
        .min(max_cookie_lifetime());
    now.checked_add_signed(lifetime)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `Expires` value in RFC 1123 form or one of the legacy Netscape/asctime forms.
fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    const LEGACY_FORMATS: [&str; 3] = [
        "%a, %d-%b-%Y %H:%M:%S GMT",
        "%A, %d-%b-%y %H:%M:%S GMT",
        "%a %b %e %H:%M:%S %Y",
    ];

    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }
    LEGACY_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|at| at.and_utc())
    })
}

fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

pub(crate) fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

pub(crate) fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
}
