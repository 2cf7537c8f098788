use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Response, Url};

use super::headers::HeaderInjector;
use super::url::{build_url, is_endpoint, normalize_base_url};
use crate::client::errors::ApiError;
use crate::client::types::RequestOptions;
use crate::config::ClientConfig;
use crate::storage::CookieJar;
use crate::utils::header_value;

/// Performs single outbound calls. It knows nothing about refreshing; that is
/// layered on top by [`ApiClient`](crate::ApiClient).
pub(crate) struct RequestExecutor {
    http: reqwest::Client,
    base_url: String,
    injectors: Vec<Arc<dyn HeaderInjector>>,
    debug: bool,
}

impl RequestExecutor {
    pub(crate) fn new(
        config: &ClientConfig,
        jar: Arc<CookieJar>,
        injectors: Vec<Arc<dyn HeaderInjector>>,
        debug: bool,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .cookie_provider(jar)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: normalize_base_url(&config.api_url),
            injectors,
            debug,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn debug(&self) -> bool {
        self.debug
    }

    pub(crate) fn url_for(&self, endpoint: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        build_url(&self.base_url, endpoint, query)
    }

    pub(crate) fn targets(&self, url: &Url, path: &str) -> bool {
        is_endpoint(url, &self.base_url, path)
    }

    pub(crate) fn build_headers(
        &self,
        url: &Url,
        options: &RequestOptions,
        access_token: Option<&str>,
    ) -> Result<HeaderMap, ApiError> {
        let mut headers = options.headers.clone();

        if options.body.is_some() && !options.has_content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }
        for injector in &self.injectors {
            injector.inject(&options.method, url, &mut headers);
        }

        Ok(headers)
    }

    /// Sends one request. Transport failures become [`ApiError::Network`]; any
    /// response, whatever its status, is returned to the caller.
    pub(crate) async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        access_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let headers = self.build_headers(url, options, access_token)?;

        let mut builder = self
            .http
            .request(options.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!("{} {}", options.method, url.path());

        builder.send().await.map_err(|e| {
            tracing::warn!("{} {} failed: {}", options.method, url, e);
            ApiError::Network(e.to_string())
        })
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("injectors", &self.injectors.len())
            .field("debug", &self.debug)
            .finish()
    }
}
