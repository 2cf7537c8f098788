use reqwest::Url;

use crate::client::errors::ApiError;
use crate::config::DEFAULT_API_URL;

/// Normalizes the configured API base: no trailing slash, no trailing `/api`
/// segment (endpoints already carry their full path). Anything that is not an
/// absolute http(s) URL falls back to the local default.
pub(crate) fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let trimmed = raw.trim_end_matches('/');
            trimmed
                .strip_suffix("/api")
                .unwrap_or(trimmed)
                .to_string()
        }
        _ => {
            tracing::warn!("Invalid API base URL {raw:?}, falling back to {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        }
    }
}

/// Joins `endpoint` onto `base`; absolute endpoints pass through unchanged.
pub(crate) fn build_url(
    base: &str,
    endpoint: &str,
    query: &[(String, String)],
) -> Result<Url, ApiError> {
    let joined = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if endpoint.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), endpoint)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), endpoint)
    };

    let mut url = Url::parse(&joined)?;
    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

/// Whether `url` targets the refresh endpoint under `base`.
pub(crate) fn is_endpoint(url: &Url, base: &str, path: &str) -> bool {
    let Ok(target) = build_url(base, path, &[]) else {
        return false;
    };
    url.scheme() == target.scheme()
        && url.host_str() == target.host_str()
        && url.port_or_known_default() == target.port_or_known_default()
        && url.path().trim_end_matches('/') == target.path().trim_end_matches('/')
}
