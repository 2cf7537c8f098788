use std::sync::Mutex;

use async_trait::async_trait;

/// Where a logged-out user is sent. Browsers follow a location; a headless
/// client usually just records or logs it.
#[async_trait]
pub trait Navigator: Send + Sync + 'static {
    async fn redirect(&self, location: &str);
}

/// Default navigator: logs the redirect target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

#[async_trait]
impl Navigator for TracingNavigator {
    async fn redirect(&self, location: &str) {
        tracing::info!("Redirecting to {}", location);
    }
}

/// Keeps every redirect it is asked for.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn redirect(&self, location: &str) {
        self.visited
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(location.to_string());
    }
}
