/// Refresh Coordinator
///
/// Collapses any number of concurrent "access token expired/rejected"
/// events into one `auth/refresh` call:
/// - the first caller becomes the leader and performs the exchange
/// - callers arriving while it runs are queued
/// - the outcome is delivered to the queue in arrival order
/// - a failure tears the session down
///
/// The coordinator returns to idle after every settle and can be reused
/// for the lifetime of the process.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::auth::backend::SessionBackend;
use crate::auth::jwt::is_expired;
use crate::auth::teardown::SessionTeardown;
use crate::auth::token_store::TokenStore;
use crate::error::ApiError;

type RefreshOutcome = Result<String, ApiError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

pub struct RefreshCoordinator {
    store: Arc<TokenStore>,
    backend: Arc<SessionBackend>,
    teardown: Arc<SessionTeardown>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<TokenStore>,
        backend: Arc<SessionBackend>,
        teardown: Arc<SessionTeardown>,
    ) -> Self {
        Self {
            store,
            backend,
            teardown,
            state: Mutex::new(RefreshState::default()),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock_state().in_flight
    }

    /// Obtain a fresh access token.
    ///
    /// # Arguments
    /// * `stale` - The access token the caller found expired or rejected.
    ///   If the store already holds a different, unexpired token, it is
    ///   returned without a network call. `None` forces a refresh.
    ///
    /// # Errors
    /// `RefreshFailure` when there is no refresh token or the exchange
    /// fails. The session has been torn down by the time this returns.
    pub async fn refresh(&self, stale: Option<&str>) -> RefreshOutcome {
        let waiter = {
            let mut state = self.lock_state();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                tracing::debug!(queued = state.waiters.len(), "Refresh in flight, queueing caller");
                Some(rx)
            } else {
                if let Some(current) = self.rotated_since(stale) {
                    tracing::debug!("Access token already rotated, skipping refresh");
                    return Ok(current);
                }
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            return rx.await.unwrap_or_else(|_| {
                Err(ApiError::RefreshFailure("Refresh was abandoned".to_string()))
            });
        }

        let in_flight = InFlight {
            coordinator: self,
            settled: false,
        };
        let outcome = self.exchange().await;

        // Clear the session while still in flight, so no caller can start
        // another exchange with the revoked refresh token.
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Token refresh failed");
            self.teardown.run(None);
        }
        in_flight.settle(&outcome);
        outcome
    }

    fn rotated_since(&self, stale: Option<&str>) -> Option<String> {
        let stale = stale?;
        let current = self.store.access_token()?;
        if current != stale && !is_expired(&current) {
            Some(current)
        } else {
            None
        }
    }

    async fn exchange(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            return Err(ApiError::RefreshFailure(
                "No refresh token available".to_string(),
            ));
        };

        let tokens = self
            .backend
            .refresh(&refresh_token)
            .await
            .map_err(|e| ApiError::RefreshFailure(e.to_string()))?;

        self.store.set(&tokens.access_token, &tokens.refresh_token);
        tracing::info!("Access token refreshed");
        Ok(tokens.access_token)
    }

    /// Return to idle and hand `outcome` to every queued caller
    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.lock_state();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        if !waiters.is_empty() {
            tracing::debug!(waiters = waiters.len(), ok = outcome.is_ok(), "Releasing queued callers");
        }
        for waiter in waiters {
            // The receiver may have been dropped; nothing to deliver then.
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles the coordinator even if the leader's future is dropped mid-exchange
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(ApiError::RefreshFailure(
                "Refresh was cancelled".to_string(),
            )));
        }
    }
}
