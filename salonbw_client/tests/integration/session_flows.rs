/// Session lifecycle tests: bootstrap, login, register, CSRF capture.
use crate::common::{MockApi, SITE_URL, TestSession, mock_api_server::CSRF_COOKIE_VALUE, test_config};
use salonbw_client::{
    ACCESS_TOKEN_KEY, DEBUG_API_KEY, DurableStore, InMemoryStore, LogoutReason, REFRESH_TOKEN_KEY, RegisterData,
    RequestOptions, Role, SessionController, SessionError, SessionEvent,
};
use serde_json::Value;
use std::sync::Arc;

#[tokio::test]
async fn test_login_populates_session_state() {
    // Given a server that accepts the credentials
    let api = MockApi::start().await;
    api.state.accept_login("AT1", "RT1");
    let test = TestSession::start(&api).await;
    let mut events = test.session.subscribe();

    // When logging in
    test.session.login("a@b.com", "secret").await.unwrap();

    // Then the profile is loaded and the pair stored everywhere
    let state = test.session.state();
    assert!(state.initialized);
    assert!(state.is_authenticated);
    assert_eq!(state.role, Some(Role::Admin));
    assert_eq!(state.user.unwrap().email, "a@b.com");

    assert_eq!(test.access_token().as_deref(), Some("AT1"));
    assert_eq!(test.refresh_token().as_deref(), Some("RT1"));
    assert_eq!(test.durable.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("AT1"));
    assert_eq!(test.durable.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("RT1"));
    assert!(test.session.client().tokens().has_auth_marker());

    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedIn {
            user_id: 1,
            role: Role::Admin
        }
    );
}

#[tokio::test]
async fn test_login_failure_carries_server_message() {
    let api = MockApi::start().await;
    api.state.accept_login("AT1", "RT1");
    let test = TestSession::start(&api).await;

    let result = test.session.login("a@b.com", "wrong").await;

    match result {
        Err(SessionError::LoginFailed { status, message }) => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("Expected LoginFailed, got {other:?}"),
    }
    assert!(!test.session.is_authenticated());
    assert_eq!(test.access_token(), None);
    // A rejected login is not a refresh trigger
    assert_eq!(api.state.refresh_count(), 0);
    assert!(test.navigator.visited().is_empty());
}

#[tokio::test]
async fn test_login_with_failing_profile_is_reported_as_login_failure() {
    // Given a server whose profile endpoint is down
    let api = MockApi::start().await;
    api.state.accept_login("AT1", "RT1");
    let test = TestSession::start(&api).await;
    api.state.break_profile();

    // When logging in
    let result = test.session.login("a@b.com", "secret").await;

    // Then login fails with the profile error and nothing is kept
    match result {
        Err(SessionError::LoginFailed { status, message }) => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "Profile service unavailable");
        }
        other => panic!("Expected LoginFailed, got {other:?}"),
    }
    assert!(!test.session.is_authenticated());
    assert_eq!(test.access_token(), None);
}

#[tokio::test]
async fn test_bootstrap_restores_persisted_session() {
    // Given tokens persisted by an earlier run and still valid on the server
    let api = MockApi::start().await;
    api.state.issue("AT-saved", "RT-saved");
    let durable = Arc::new(InMemoryStore::new());
    durable.set(ACCESS_TOKEN_KEY, "AT-saved").unwrap();
    durable.set(REFRESH_TOKEN_KEY, "RT-saved").unwrap();

    // When a session starts
    let test = TestSession::start_with(test_config(&api), durable).await;

    // Then exactly one profile fetch authenticated it
    assert!(test.session.is_initialized());
    assert!(test.session.is_authenticated());
    assert_eq!(test.session.role(), Some(Role::Admin));
    assert_eq!(api.state.profile_count(), 1);

    let bootstrap = &api.state.seen_on("/users/profile")[0];
    assert_eq!(bootstrap.authorization.as_deref(), Some("Bearer AT-saved"));
    assert_eq!(bootstrap.cache_control.as_deref(), Some("no-store"));
    // The skip marker never leaves the client
    assert_eq!(bootstrap.skip_logout, None);
}

#[tokio::test]
async fn test_failed_bootstrap_clears_without_redirect() {
    // Given persisted tokens the server no longer accepts
    let api = MockApi::start().await;
    let durable = Arc::new(InMemoryStore::new());
    durable.set(ACCESS_TOKEN_KEY, "AT-revoked").unwrap();
    durable.set(REFRESH_TOKEN_KEY, "RT-revoked").unwrap();

    // When the session starts
    let test = TestSession::start_with(test_config(&api), durable.clone()).await;

    // Then it is initialized but anonymous, with no redirect
    let state = test.session.state();
    assert!(state.initialized);
    assert!(!state.is_authenticated);
    assert_eq!(state.user, None);
    assert!(test.navigator.visited().is_empty());
    assert_eq!(durable.get(ACCESS_TOKEN_KEY).unwrap(), None);
    // The refresh attempt was made once and failed
    assert_eq!(api.state.refresh_count(), 1);
}

#[tokio::test]
async fn test_bootstrap_refreshes_expired_access_token() {
    // Given an expired access token but a live refresh token
    let api = MockApi::start().await;
    api.state.issue("AT-expired", "RT-live");
    api.state.expire_access_tokens();
    api.state.queue_refresh("AT-new", "RT-new");
    let durable = Arc::new(InMemoryStore::new());
    durable.set(ACCESS_TOKEN_KEY, "AT-expired").unwrap();
    durable.set(REFRESH_TOKEN_KEY, "RT-live").unwrap();

    // When the session starts
    let test = TestSession::start_with(test_config(&api), durable).await;

    // Then the bootstrap refreshed and retried
    assert!(test.session.is_authenticated());
    assert_eq!(test.access_token().as_deref(), Some("AT-new"));
    assert_eq!(api.state.profile_count(), 2);
}

#[tokio::test]
async fn test_initialized_flips_once() {
    let api = MockApi::start().await;
    let session = SessionController::builder(test_config(&api))
        .build()
        .unwrap();

    session.wait_until_initialized().await;
    assert!(session.is_initialized());

    // Logging out afterwards does not reset it
    session.logout().await;
    assert!(session.is_initialized());
}

#[test]
fn test_build_outside_runtime_is_an_error() {
    let config = salonbw_client::ClientConfig::new("http://127.0.0.1:9");
    let result = SessionController::new(config);

    assert!(matches!(result, Err(SessionError::Setup(_))));
}

#[tokio::test]
async fn test_register_then_login() {
    let api = MockApi::start().await;
    api.state.accept_login("AT1", "RT1");
    let test = TestSession::start(&api).await;

    test.session
        .register(RegisterData {
            name: "Anna".to_string(),
            email: "a@b.com".to_string(),
            phone: "+48500100200".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();

    assert!(test.session.is_authenticated());
    assert_eq!(
        api.state
            .register_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        api.state.login_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_register_conflict() {
    let api = MockApi::start().await;
    let test = TestSession::start(&api).await;

    let result = test
        .session
        .register(RegisterData {
            name: "Anna".to_string(),
            email: "taken@b.com".to_string(),
            phone: "+48500100200".to_string(),
            password: "secret".to_string(),
        })
        .await;

    assert_eq!(result.unwrap_err().to_string(), "Email already in use");
    assert_eq!(
        api.state.login_calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_csrf_cookie_is_mirrored_on_mutations() {
    // Given a login that set the XSRF-TOKEN cookie
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;

    // When a GET and a POST are made
    let _: Value = test
        .session
        .request("/customers", RequestOptions::get())
        .await
        .unwrap()
        .into_json()
        .unwrap();
    let created: Value = test
        .session
        .request(
            "/customers",
            RequestOptions::post()
                .json(&serde_json::json!({"name": "Jan"}))
                .unwrap(),
        )
        .await
        .unwrap()
        .into_json()
        .unwrap();

    // Then only the POST carries the CSRF header, next to the bearer token
    assert_eq!(created["id"], 8);
    let seen = api.state.seen_on("/customers");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].csrf, None);
    assert_eq!(seen[1].csrf.as_deref(), Some(CSRF_COOKIE_VALUE));
    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer AT1"));
    assert_eq!(seen[1].content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_debug_mode_tags_requests() {
    let api = MockApi::start().await;
    let config = test_config(&api).with_debug(true);
    let test = TestSession::start_with(config, Arc::new(InMemoryStore::new())).await;

    let payload = test
        .session
        .request::<Value>("/ping", RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(payload.text(), Some("pong"));
    let bootstrap = &api.state.seen_on("/users/profile")[0];
    assert!(bootstrap.request_id.is_some());
}

#[tokio::test]
async fn test_local_debug_toggle_tags_requests() {
    // Given debug off in config but the local toggle persisted
    let api = MockApi::start().await;
    let durable = Arc::new(InMemoryStore::new());
    durable.set(DEBUG_API_KEY, "1").unwrap();

    // When the session starts
    let _test = TestSession::start_with(test_config(&api), durable).await;

    // Then the bootstrap request carries a correlation id
    let bootstrap = &api.state.seen_on("/users/profile")[0];
    assert!(bootstrap.request_id.is_some());
}

#[tokio::test]
async fn test_linked_sessions_log_out_together() {
    // Given the panel and the landing app linked to each other
    let api = MockApi::start().await;
    let panel = TestSession::logged_in(&api).await;
    let landing = TestSession::logged_in(&api).await;
    panel.session.link_logout(&landing.session);
    landing.session.link_logout(&panel.session);
    let mut landing_events = landing.session.subscribe();

    // When the panel logs out
    panel.session.logout().await;

    // Then the landing app follows, once, without echoing back
    let event = tokio::time::timeout(std::time::Duration::from_secs(2), landing_events.recv())
        .await
        .expect("Linked logout did not arrive")
        .unwrap();
    assert_eq!(
        event,
        SessionEvent::LoggedOut {
            reason: LogoutReason::Propagated
        }
    );
    assert!(!landing.session.is_authenticated());
    assert_eq!(landing.navigator.visited(), vec![SITE_URL]);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(panel.navigator.visited(), vec![SITE_URL]);
    assert_eq!(api.state.logout_count(), 1);
}
