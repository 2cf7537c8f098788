use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::headers::REQUEST_ID_HEADER;
use crate::client::errors::ApiError;
use crate::client::types::Payload;
use crate::utils::header_str;

/// Turns a response into a payload or a typed error.
pub(crate) async fn read_payload<T: DeserializeOwned>(
    response: Response,
    debug: bool,
) -> Result<Payload<T>, ApiError> {
    let status = response.status();
    log_correlation_id(response.headers(), debug);

    if status == StatusCode::NO_CONTENT {
        return Ok(Payload::NoContent);
    }

    let content_type = header_str(response.headers(), CONTENT_TYPE.as_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    if !status.is_success() {
        let error = error_from_body(status, &content_type, &body);
        tracing::debug!("Request failed with {}: {}", status, error);
        return Err(error);
    }

    decode_success(&content_type, body)
}

fn decode_success<T: DeserializeOwned>(
    content_type: &str,
    body: String,
) -> Result<Payload<T>, ApiError> {
    if body.is_empty() {
        return Ok(Payload::NoContent);
    }
    if is_json(content_type) {
        return Ok(Payload::Json(serde_json::from_str(&body)?));
    }
    if content_type.contains("text/") {
        return Ok(Payload::Text(body));
    }
    Ok(Payload::NoContent)
}

pub(crate) fn error_from_body(status: StatusCode, content_type: &str, body: &str) -> ApiError {
    let message = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => json_message(map.get("message")),
        Ok(_) if is_json(content_type) => None,
        _ => Some(body.trim().to_string()).filter(|text| !text.is_empty()),
    };

    ApiError::Http {
        status: status.as_u16(),
        message: message.unwrap_or_else(|| status_text(status)),
    }
}

/// NestJS validation errors carry `message` as a list of strings.
fn json_message(message: Option<&Value>) -> Option<String> {
    match message? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Some(joined).filter(|text| !text.is_empty())
        }
        _ => None,
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn is_json(content_type: &str) -> bool {
    content_type.contains("application/json") || content_type.contains("+json")
}

fn log_correlation_id(headers: &HeaderMap, debug: bool) {
    if !debug {
        return;
    }
    if let Some(request_id) = header_str(headers, REQUEST_ID_HEADER) {
        tracing::info!(request_id, "[api] x-request-id: {}", request_id);
    }
}
