use std::sync::Arc;

use super::controller::SessionInner;
use crate::client::RequestOptions;
use crate::config::LOGOUT_PATH;
use crate::session::types::{LogoutReason, SessionEvent};

/// Runs a logout to completion on its own task. Dropping the returned future
/// does not stop local state from being cleared.
pub(crate) async fn run_logout(inner: Arc<SessionInner>, reason: LogoutReason) {
    let task = tokio::spawn(perform_logout(inner, reason));
    if let Err(e) = task.await {
        tracing::error!("Logout task failed: {}", e);
    }
}

async fn perform_logout(inner: Arc<SessionInner>, reason: LogoutReason) {
    let _serialized = inner.logout_lock.lock().await;
    tracing::info!(?reason, "Logging out");

    // A linked peer already ended the server-side session.
    if reason != LogoutReason::Propagated {
        notify_server(&inner).await;
    }

    inner.clear_local().await;

    // No subscribers is fine
    let _ = inner.events.send(SessionEvent::LoggedOut { reason });
    inner.navigator.redirect(&inner.config.site_url).await;
}

/// Best-effort `POST /auth/logout`, bounded by the configured timeout.
async fn notify_server(inner: &SessionInner) {
    let options = RequestOptions::post().skip_logout();
    let call = inner
        .client
        .execute_without_refresh::<serde_json::Value>(LOGOUT_PATH, options);

    match tokio::time::timeout(inner.config.logout_timeout, call).await {
        Ok(Ok(_)) => tracing::debug!("Server logout acknowledged"),
        Ok(Err(e)) => tracing::warn!("Logout error: {}", e),
        Err(_) => tracing::warn!(
            "Server logout did not answer within {:?}",
            inner.config.logout_timeout
        ),
    }
}
