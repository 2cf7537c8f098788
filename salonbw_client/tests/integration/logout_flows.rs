/// Logout: completeness, idempotence, bounded server wait, cancellation.
use crate::common::{MockApi, SITE_URL, TestSession, test_config};
use salonbw_client::{
    ACCESS_TOKEN_KEY, DurableStore, FileStore, LogoutReason, REFRESH_TOKEN_KEY, RecordingNavigator,
    SessionController, SessionEvent, SessionState,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn logged_out_state() -> SessionState {
    SessionState {
        user: None,
        role: None,
        initialized: true,
        is_authenticated: false,
    }
}

#[tokio::test]
async fn test_logout_clears_everything() {
    // Given a logged-in session
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;
    let mut events = test.session.subscribe();

    // When logging out
    test.session.logout().await;

    // Then state, tokens, cookies and CSRF token are gone and the user is redirected
    assert_eq!(test.session.state(), logged_out_state());
    assert_eq!(test.access_token(), None);
    assert_eq!(test.refresh_token(), None);
    assert_eq!(test.durable.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(test.durable.get(REFRESH_TOKEN_KEY).unwrap(), None);
    assert!(!test.session.client().tokens().has_auth_marker());
    assert_eq!(test.navigator.visited(), vec![SITE_URL]);
    assert_eq!(api.state.logout_count(), 1);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested
        }
    );
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;

    test.session.logout().await;
    let after_first = test.session.state();
    test.session.logout().await;

    assert_eq!(test.session.state(), after_first);
    assert_eq!(after_first, logged_out_state());
    assert_eq!(test.access_token(), None);
}

#[tokio::test]
async fn test_logout_when_never_logged_in() {
    let api = MockApi::start().await;
    let test = TestSession::start(&api).await;

    test.session.logout().await;

    assert_eq!(test.session.state(), logged_out_state());
    assert_eq!(test.navigator.visited(), vec![SITE_URL]);
}

#[tokio::test]
async fn test_concurrent_logouts() {
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;

    let first = test.session.clone();
    let second = test.session.clone();
    tokio::join!(first.logout(), second.logout());

    assert_eq!(test.session.state(), logged_out_state());
    assert_eq!(test.access_token(), None);
    assert_eq!(test.navigator.visited().len(), 2);
}

#[tokio::test]
async fn test_hanging_server_logout_is_bounded() {
    // Given a logout endpoint that never answers
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;
    api.state.hang_logout();

    // When logging out
    let started = Instant::now();
    test.session.logout().await;

    // Then local state is cleared after the bounded wait
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(test.access_token(), None);
    assert!(!test.session.is_authenticated());
    assert_eq!(test.navigator.visited(), vec![SITE_URL]);
}

#[tokio::test]
async fn test_dropped_logout_still_completes() {
    // Given a slow logout endpoint
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;
    api.state.hang_logout();

    // When the caller gives up on logout almost immediately
    let gave_up = tokio::time::timeout(Duration::from_millis(20), test.session.logout()).await;
    assert!(gave_up.is_err());

    // Then clearing still happens in the background
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(test.access_token(), None);
    assert!(!test.session.is_authenticated());
    assert_eq!(test.navigator.visited(), vec![SITE_URL]);
}

#[tokio::test]
async fn test_logout_during_inflight_request() {
    // Given a request that is still waiting on the server
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;
    api.state.hang_logout();

    let session = test.session.clone();
    let pending = tokio::spawn(async move {
        session
            .request::<serde_json::Value>(
                "/auth/logout",
                salonbw_client::RequestOptions::post().timeout(Duration::from_secs(3)),
            )
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // When logging out meanwhile
    test.session.logout().await;

    // Then logout completes without waiting for that request
    assert_eq!(test.access_token(), None);
    assert!(!pending.is_finished());
    pending.abort();
}

#[tokio::test]
async fn test_refreshed_token_is_not_used_after_logout() {
    // Given an expired access token and a slow refresh endpoint
    let api = MockApi::start().await;
    let test = TestSession::logged_in(&api).await;
    api.state.expire_access_tokens();
    api.state.queue_refresh("AT2", "RT2");
    api.state.set_refresh_delay(Duration::from_millis(300));

    let session = test.session.clone();
    let pending = tokio::spawn(async move {
        session
            .request::<serde_json::Value>("/customers", salonbw_client::RequestOptions::get())
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // When the user logs out while the refresh is still running
    test.session.logout().await;
    let result = pending.await.unwrap();

    // Then the request fails and the new token never reaches the API
    assert!(matches!(result, Err(salonbw_client::ApiError::Unauthorized)));
    assert_eq!(test.access_token(), None);
    assert_eq!(test.refresh_token(), None);
    assert!(!test.session.is_authenticated());
    let seen = api.state.seen_on("/customers");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer AT1"));
    // Only the explicit logout redirected
    assert_eq!(test.navigator.visited(), vec![SITE_URL]);
}

#[tokio::test]
async fn test_logout_removes_file_persisted_tokens() {
    // Given tokens persisted to a file
    let api = MockApi::start().await;
    api.state.accept_login("AT1", "RT1");
    let path = std::env::temp_dir().join(format!("salonbw-tokens-{}.json", uuid::Uuid::new_v4()));
    let store = Arc::new(FileStore::new(&path));
    let session = SessionController::builder(test_config(&api))
        .durable_store(store.clone())
        .navigator(Arc::new(RecordingNavigator::new()))
        .build()
        .unwrap();
    session.wait_until_initialized().await;
    session.login("a@b.com", "secret").await.unwrap();
    assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("RT1"));

    // When logging out
    session.logout().await;

    // Then the file no longer holds them
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    let _ = std::fs::remove_file(&path);
}
