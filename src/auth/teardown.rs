use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::auth::token_store::TokenStore;
use crate::navigation::Navigator;

/// Shared failure path of the session: clear the store, send the user to sign-in.
///
/// Safe to run any number of times, from any task. Only the first run
/// after a session was established redirects; later runs just clear.
pub struct SessionTeardown {
    store: Arc<TokenStore>,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
    redirected: AtomicBool,
}

impl SessionTeardown {
    pub fn new(store: Arc<TokenStore>, navigator: Arc<dyn Navigator>, sign_in_path: String) -> Self {
        Self {
            store,
            navigator,
            sign_in_path,
            redirected: AtomicBool::new(false),
        }
    }

    pub fn run(&self, return_to: Option<&str>) {
        self.store.clear();
        if !self.redirected.swap(true, Ordering::SeqCst) {
            tracing::warn!("Session torn down");
            self.navigator.redirect_to_sign_in(&self.sign_in_path, return_to);
        }
    }

    /// Called once a new session exists so the next failure redirects again
    pub fn rearm(&self) {
        self.redirected.store(false, Ordering::SeqCst);
    }
}
