use std::sync::Arc;

use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use super::controller::{ExpiryBridge, SessionController, SessionInner};
use crate::client::{
    ApiClient, CorrelationHeader, CsrfHeader, HeaderInjector, RequestExecutor, normalize_base_url,
};
use crate::config::ClientConfig;
use crate::session::errors::SessionError;
use crate::session::navigator::{Navigator, TracingNavigator};
use crate::storage::{CookieJar, CookieScope, DurableStore, InMemoryStore, TokenStore, domain_matches};

const EVENT_CAPACITY: usize = 32;

/// Assembles a [`SessionController`]. Anything not supplied gets an in-memory
/// default.
pub struct SessionControllerBuilder {
    config: ClientConfig,
    durable: Option<Arc<dyn DurableStore>>,
    jar: Option<Arc<CookieJar>>,
    navigator: Option<Arc<dyn Navigator>>,
    injectors: Vec<Arc<dyn HeaderInjector>>,
}

impl SessionControllerBuilder {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self {
            config,
            durable: None,
            jar: None,
            navigator: None,
            injectors: Vec::new(),
        }
    }

    pub fn durable_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(store);
        self
    }

    /// Share a jar between sessions to model apps on one parent domain.
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Runs after the built-in CSRF and correlation injectors.
    pub fn header_injector(mut self, injector: Arc<dyn HeaderInjector>) -> Self {
        self.injectors.push(injector);
        self
    }

    /// Builds the controller and starts the bootstrap profile fetch.
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<SessionController, SessionError> {
        let runtime = Handle::try_current()
            .map_err(|e| SessionError::Setup(format!("No tokio runtime: {e}")))?;

        let base_url = normalize_base_url(&self.config.api_url);
        let api_url = Url::parse(&base_url)
            .map_err(|e| SessionError::Setup(format!("Invalid API URL {base_url}: {e}")))?;
        let host = api_url.host_str().unwrap_or("localhost").to_string();

        // A parent-domain cookie the API host could never see would be useless.
        let cookie_domain = self
            .config
            .cookie_domain
            .clone()
            .filter(|domain| domain_matches(&host, domain.trim_start_matches('.')));
        let scope = CookieScope::host_only(host).with_domain(cookie_domain);

        let jar = self.jar.unwrap_or_else(|| Arc::new(CookieJar::new()));
        let durable = self
            .durable
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()) as Arc<dyn DurableStore>);
        let tokens = Arc::new(TokenStore::new(jar.clone(), durable, scope, api_url.clone()));

        let debug_enabled = self.config.debug || tokens.debug_toggle();
        let csrf = Arc::new(CsrfHeader::new(jar.clone()));
        let mut injectors: Vec<Arc<dyn HeaderInjector>> = vec![
            csrf.clone() as Arc<dyn HeaderInjector>,
            Arc::new(CorrelationHeader::new(debug_enabled)),
        ];
        injectors.extend(self.injectors);

        let executor = RequestExecutor::new(&self.config, jar, injectors, debug_enabled)
            .map_err(|e| SessionError::Setup(e.to_string()))?;

        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(TracingNavigator) as Arc<dyn Navigator>);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let config = self.config;

        let inner = Arc::new_cyclic(|weak| {
            let client = ApiClient::new(
                executor,
                tokens,
                csrf,
                Arc::new(ExpiryBridge(weak.clone())),
                events.clone(),
            );
            SessionInner::new(config, client, api_url, events, navigator)
        });

        inner.capture_csrf();
        tracing::debug!(base_url = %base_url, debug = debug_enabled, "Session controller created");

        let bootstrap = inner.clone();
        runtime.spawn(async move { bootstrap.bootstrap().await });

        Ok(SessionController { inner })
    }
}
