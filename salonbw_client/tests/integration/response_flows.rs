/// Response normalization and error extraction through the full client.
use crate::common::{MockApi, TestSession};
use salonbw_client::{ApiError, ApiRequest, ClientConfig, InMemoryStore, Payload, RequestOptions};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_no_content_and_empty_body_are_the_same() {
    let api = MockApi::start().await;
    let test = TestSession::start(&api).await;

    let no_content = test
        .session
        .request::<Value>("/no-content", RequestOptions::get())
        .await
        .unwrap();
    let empty = test
        .session
        .request::<Value>("/empty", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(no_content, Payload::NoContent);
    assert_eq!(empty, no_content);
}

#[tokio::test]
async fn test_text_and_unknown_content_types() {
    let api = MockApi::start().await;
    let test = TestSession::start(&api).await;

    let text = test
        .session
        .request::<Value>("/ping", RequestOptions::get())
        .await
        .unwrap();
    let pdf = test
        .session
        .request::<Value>("/export.pdf", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(text, Payload::Text("pong".to_string()));
    assert!(pdf.is_no_content());
}

#[tokio::test]
async fn test_error_messages_are_extracted() {
    let api = MockApi::start().await;
    let test = TestSession::start(&api).await;

    // JSON body with a message
    let json_error = test
        .session
        .request::<Value>(
            "/products",
            RequestOptions::post().json(&json!({"quantity": 0})).unwrap(),
        )
        .await
        .unwrap_err();
    assert_eq!(json_error.status(), Some(400));
    assert_eq!(json_error.to_string(), "Quantity must be at least 1");

    // Plain text body
    let text_error = test
        .session
        .request::<Value>("/slots", RequestOptions::post())
        .await
        .unwrap_err();
    assert_eq!(text_error.status(), Some(409));
    assert_eq!(text_error.to_string(), "Slot already booked");

    // Neither
    let bare_error = test
        .session
        .request::<Value>("/reports/missing", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(bare_error.status(), Some(404));
    assert_eq!(bare_error.to_string(), "Not Found");
}

#[tokio::test]
async fn test_malformed_json_is_a_serde_error() {
    let api = MockApi::start().await;
    let test = TestSession::start(&api).await;

    let result = test
        .session
        .request::<Value>("/reports/bad-json", RequestOptions::get())
        .await;

    assert!(matches!(result, Err(ApiError::Serde(_))));
}

#[tokio::test]
async fn test_typed_request_with_path_params_and_query() {
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;

    let notes: Value = test
        .session
        .request_typed(
            ApiRequest::get("/customers/{id}/notes")
                .path_param("id", 42)
                .query("page", 2)
                .query("q", "farbowanie włosów"),
        )
        .await
        .unwrap()
        .into_json()
        .unwrap();

    assert_eq!(notes["customerId"], "42");
    assert_eq!(notes["query"], "page=2&q=farbowanie+w%C5%82os%C3%B3w");
}

#[tokio::test]
async fn test_unreachable_api_is_a_network_error() {
    // Given an API that is not listening
    let config = ClientConfig::new("http://127.0.0.1:9")
        .with_cookie_domain(None)
        .with_request_timeout(Duration::from_secs(2));
    let test = TestSession::start_with(config, Arc::new(InMemoryStore::new())).await;

    // When a request is made
    let error = test
        .session
        .request::<Value>("/customers", RequestOptions::get())
        .await
        .unwrap_err();

    // Then it is a generic network error without a status
    assert!(matches!(error, ApiError::Network(_)));
    assert_eq!(error.to_string(), "Network error");
    assert_eq!(error.status(), None);
    assert!(test.session.is_initialized());
    assert!(!test.session.is_authenticated());
}

#[tokio::test]
async fn test_per_request_timeout_surfaces_as_network_error() {
    let api = MockApi::start().await;
    api.state.hang_logout();
    let test = TestSession::start(&api).await;

    let result = test
        .session
        .request::<Value>(
            "/auth/logout",
            RequestOptions::post().timeout(Duration::from_millis(100)),
        )
        .await;

    assert!(matches!(result, Err(ApiError::Network(_))));
}
