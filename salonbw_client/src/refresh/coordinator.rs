use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Mutex;

use super::errors::RefreshError;
use super::types::{RefreshOutcome, RefreshState};
use crate::storage::CredentialPair;

#[derive(Debug)]
struct RefreshRecord {
    /// Access token whose rejection this exchange answered.
    rejected: Option<String>,
    outcome: RefreshOutcome,
}

/// Single-flight gate for the refresh-token exchange.
///
/// Every caller that saw a 401 queues on one async mutex. The first one through
/// runs the exchange and records the outcome under the access token that was
/// rejected; callers rejected with that same token take the recorded outcome
/// instead of exchanging again. A caller rejected with a different token is
/// answering a newer expiry and gets a fresh exchange.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    gate: Mutex<Option<RefreshRecord>>,
    in_flight: AtomicBool,
    exchanges: AtomicU64,
    /// Moves whenever credentials are cleared.
    generation: AtomicU64,
}

/// Clears the in-flight flag even when the exchanging future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RefreshState {
        if self.in_flight.load(Ordering::SeqCst) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Number of exchanges actually performed since construction.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Credential generation; changes whenever the session is cleared.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Resolves a 401 observed with `rejected` as the bearer token, for a request
    /// sent during generation `started_in`.
    pub(crate) async fn resolve<F, Fut>(
        &self,
        rejected: Option<String>,
        started_in: u64,
        exchange: F,
    ) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CredentialPair, RefreshError>>,
    {
        let mut record = self.gate.lock().await;

        if self.generation() != started_in {
            tracing::debug!("Session cleared since the request was sent, not refreshing");
            return RefreshOutcome::Superseded;
        }

        if let Some(previous) = record.as_ref().filter(|r| r.rejected == rejected) {
            tracing::debug!("Joining completed refresh: {}", outcome_label(&previous.outcome));
            return previous.outcome.clone();
        }

        let outcome = self.run(exchange).await;
        *record = Some(RefreshRecord {
            rejected,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Runs an exchange unconditionally, still serialized with reactive refreshes.
    /// Callers later rejected with `replaced` share this outcome.
    pub(crate) async fn exchange_now<F, Fut>(
        &self,
        replaced: Option<String>,
        exchange: F,
    ) -> Result<CredentialPair, RefreshError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CredentialPair, RefreshError>>,
    {
        let mut record = self.gate.lock().await;

        let result = {
            let _in_flight = InFlight::enter(&self.in_flight);
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            exchange().await
        };

        let outcome = match &result {
            Ok(pair) => RefreshOutcome::Renewed(pair.clone()),
            Err(e) => {
                e.clone().log();
                RefreshOutcome::Failed
            }
        };
        *record = Some(RefreshRecord {
            rejected: replaced,
            outcome,
        });
        result
    }

    /// Forgets the last outcome and runs `clear` while no exchange can be in
    /// flight, so an exchange finishing late cannot bring credentials back.
    ///
    /// The generation moves on entry, so a refresh already in flight is not
    /// retried, and again after clearing, so requests sent in between are
    /// superseded too.
    pub(crate) async fn reset_with<F: FnOnce()>(&self, clear: F) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut record = self.gate.lock().await;
        clear();
        *record = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    async fn run<F, Fut>(&self, exchange: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CredentialPair, RefreshError>>,
    {
        let _in_flight = InFlight::enter(&self.in_flight);
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Starting refresh exchange");

        match exchange().await {
            Ok(pair) => {
                tracing::debug!("Refresh exchange succeeded");
                RefreshOutcome::Renewed(pair)
            }
            Err(e) => {
                e.log();
                RefreshOutcome::Failed
            }
        }
    }
}

fn outcome_label(outcome: &RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::Renewed(_) => "renewed",
        RefreshOutcome::Failed => "failed",
        RefreshOutcome::Superseded => "superseded",
    }
}
