use std::sync::{Arc, RwLock};

use reqwest::header::HeaderMap;
use reqwest::{Method, Url};

use crate::storage::CookieJar;
use crate::utils::{gen_request_id, header_value};

pub(crate) const CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";
pub(crate) const CSRF_HEADER_NAME: &str = "x-xsrf-token";
pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

/// Adds headers to every outgoing request after the caller's own headers and the
/// `Authorization` header are in place.
pub trait HeaderInjector: Send + Sync + 'static {
    fn inject(&self, method: &Method, url: &Url, headers: &mut HeaderMap);
}

/// Mirrors the `XSRF-TOKEN` cookie into `X-XSRF-TOKEN` on state-changing requests.
#[derive(Debug)]
pub struct CsrfHeader {
    jar: Arc<CookieJar>,
    captured: RwLock<Option<String>>,
}

impl CsrfHeader {
    pub fn new(jar: Arc<CookieJar>) -> Self {
        Self {
            jar,
            captured: RwLock::new(None),
        }
    }

    /// Remembers the cookie value currently visible to `url`.
    pub fn capture(&self, url: &Url) -> Option<String> {
        let token = self.jar.get(CSRF_COOKIE_NAME, url);
        *self.captured.write().unwrap_or_else(|e| e.into_inner()) = token.clone();
        token
    }

    pub fn clear(&self) {
        *self.captured.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn captured(&self) -> Option<String> {
        self.captured
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl HeaderInjector for CsrfHeader {
    fn inject(&self, method: &Method, url: &Url, headers: &mut HeaderMap) {
        if *method == Method::GET || headers.contains_key(CSRF_HEADER_NAME) {
            return;
        }
        let Some(token) = self.jar.get(CSRF_COOKIE_NAME, url).or_else(|| self.captured()) else {
            return;
        };
        match header_value(&token) {
            Ok(value) => {
                headers.insert(CSRF_HEADER_NAME, value);
            }
            Err(e) => tracing::warn!("Skipping CSRF header: {e}"),
        }
    }
}

/// Tags requests with a fresh `X-Request-Id` when debugging is on.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationHeader {
    enabled: bool,
}

impl CorrelationHeader {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl HeaderInjector for CorrelationHeader {
    fn inject(&self, _method: &Method, _url: &Url, headers: &mut HeaderMap) {
        if !self.enabled || headers.contains_key(REQUEST_ID_HEADER) {
            return;
        }
        if let Ok(value) = header_value(&gen_request_id()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }
}
