use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqwest::Url;

use super::cookie_jar::CookieJar;
use super::durable::DurableStore;
use super::types::{
    ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_KEY, AUTH_MARKER_COOKIE, CookieScope, CredentialPair,
    DEBUG_API_KEY, LEGACY_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_KEY,
};

/// Single source of truth for the current credential pair.
///
/// Writes go to the in-memory copy, the cookie jar and the durable store. Writers
/// are serialized among themselves; readers only ever wait for the in-memory swap,
/// never for backend I/O, and never see an access token from one pair next to a
/// refresh token from another. Backend failures are logged and read as "absent".
///
/// [`DurableStore`] calls are synchronous, so a slow backend blocks the writing
/// task for the duration of the write.
pub struct TokenStore {
    current: RwLock<Option<CredentialPair>>,
    writer: Mutex<()>,
    jar: Arc<CookieJar>,
    durable: Arc<dyn DurableStore>,
    scope: CookieScope,
    /// URL the credential cookies are read back for.
    cookie_url: Url,
}

impl TokenStore {
    /// Creates the store and picks up any pair persisted by an earlier run.
    pub fn new(
        jar: Arc<CookieJar>,
        durable: Arc<dyn DurableStore>,
        scope: CookieScope,
        cookie_url: Url,
    ) -> Self {
        let store = Self {
            current: RwLock::new(None),
            writer: Mutex::new(()),
            jar,
            durable,
            scope,
            cookie_url,
        };

        let restored = store.load_persisted();
        if restored.is_some() {
            tracing::debug!("Restored persisted credential pair");
        }
        *store.write_current() = restored;
        store
    }

    fn read_current(&self) -> RwLockReadGuard<'_, Option<CredentialPair>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_current(&self) -> RwLockWriteGuard<'_, Option<CredentialPair>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }

    fn durable_get(&self, key: &str) -> Option<String> {
        match self.durable.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read {key} from durable store: {e}");
                None
            }
        }
    }

    fn cookie_get(&self, name: &str) -> Option<String> {
        self.jar
            .get(name, &self.cookie_url)
            .filter(|v| !v.is_empty())
    }

    fn load_persisted(&self) -> Option<CredentialPair> {
        let access = self
            .cookie_get(ACCESS_TOKEN_COOKIE)
            .or_else(|| self.durable_get(ACCESS_TOKEN_KEY))?;
        let refresh = self
            .cookie_get(REFRESH_TOKEN_COOKIE)
            .or_else(|| self.durable_get(REFRESH_TOKEN_KEY))
            .unwrap_or_default();
        Some(CredentialPair {
            access_token: access,
            refresh_token: refresh,
        })
    }

    /// Current access token: in-memory copy first, then the cookie, then the durable store.
    pub fn read_access_token(&self) -> Option<String> {
        let current = self.read_current();
        if let Some(pair) = current.as_ref() {
            return Some(pair.access_token.clone());
        }
        self.cookie_get(ACCESS_TOKEN_COOKIE)
            .or_else(|| self.durable_get(ACCESS_TOKEN_KEY))
    }

    /// Current refresh token, with the same fallback order as [`Self::read_access_token`].
    pub fn read_refresh_token(&self) -> Option<String> {
        let current = self.read_current();
        if let Some(pair) = current.as_ref().filter(|p| !p.refresh_token.is_empty()) {
            return Some(pair.refresh_token.clone());
        }
        self.cookie_get(REFRESH_TOKEN_COOKIE)
            .or_else(|| self.durable_get(REFRESH_TOKEN_KEY))
    }

    pub fn read_pair(&self) -> Option<CredentialPair> {
        let current = self.read_current();
        current.clone().or_else(|| self.load_persisted())
    }

    /// Replaces (`Some`) or clears (`None`) every copy of the credential pair.
    pub fn write(&self, pair: Option<CredentialPair>) {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        match &pair {
            Some(pair) => {
                // Readers take the new pair from memory while the backends catch up
                *self.write_current() = Some(pair.clone());
                self.jar
                    .set(ACCESS_TOKEN_COOKIE, &pair.access_token, &self.scope);
                self.jar
                    .set(REFRESH_TOKEN_COOKIE, &pair.refresh_token, &self.scope);
                self.jar.set(AUTH_MARKER_COOKIE, "true", &self.scope);
                self.durable_set(ACCESS_TOKEN_KEY, &pair.access_token);
                self.durable_set(REFRESH_TOKEN_KEY, &pair.refresh_token);
            }
            None => {
                for name in [
                    ACCESS_TOKEN_COOKIE,
                    REFRESH_TOKEN_COOKIE,
                    AUTH_MARKER_COOKIE,
                    LEGACY_TOKEN_COOKIE,
                ] {
                    self.jar.remove(name, &self.scope);
                }
                self.durable_remove(ACCESS_TOKEN_KEY);
                self.durable_remove(REFRESH_TOKEN_KEY);
                // Only now can a fallback read find nothing left behind
                *self.write_current() = None;
            }
        }
    }

    /// Whether the coarse `sbw_auth` marker cookie is present.
    pub fn has_auth_marker(&self) -> bool {
        self.cookie_get(AUTH_MARKER_COOKIE).is_some()
    }

    /// Local debug toggle persisted next to the tokens.
    pub fn debug_toggle(&self) -> bool {
        self.durable_get(DEBUG_API_KEY).as_deref() == Some("1")
    }

    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.jar
    }

    fn durable_set(&self, key: &str, value: &str) {
        if let Err(e) = self.durable.set(key, value) {
            tracing::warn!("Failed to persist {key}: {e}");
        }
    }

    fn durable_remove(&self, key: &str) {
        if let Err(e) = self.durable.remove(key) {
            tracing::warn!("Failed to remove {key}: {e}");
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_pair", &self.read_current().is_some())
            .field("scope", &self.scope)
            .finish()
    }
}
