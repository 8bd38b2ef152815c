/// Route Guard
///
/// Navigation-time session checks for the router layer.

use std::sync::Arc;

use crate::auth::SessionLifecycle;

/// Per-route metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMeta {
    /// Dashboard routes require a session unless they opt out
    pub requires_auth: bool,
    /// Sign-in and registration pages
    pub guest_only: bool,
}

impl Default for RouteMeta {
    fn default() -> Self {
        Self {
            requires_auth: true,
            guest_only: false,
        }
    }
}

impl RouteMeta {
    pub fn public() -> Self {
        Self {
            requires_auth: false,
            guest_only: false,
        }
    }

    pub fn guest_only() -> Self {
        Self {
            requires_auth: false,
            guest_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    RedirectToDashboard,
    /// Go to sign-in, then resume at `return_to`
    RedirectToSignIn { return_to: String },
}

pub struct RouteGuard {
    session: Arc<SessionLifecycle>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionLifecycle>) -> Self {
        Self { session }
    }

    /// Decide whether navigation to `destination` may proceed.
    ///
    /// An expired session with a refresh token is refreshed before
    /// giving up on a protected route.
    pub async fn before_each(&self, destination: &str, meta: RouteMeta) -> GuardDecision {
        // A restored session counts before `initialize` has run.
        let mut authenticated = self.session.is_authenticated() || self.session.has_valid_token();

        if authenticated && meta.guest_only {
            return GuardDecision::RedirectToDashboard;
        }

        if !authenticated
            && meta.requires_auth
            && self.session.has_expired_token()
            && self.session.can_refresh_token()
        {
            tracing::debug!(destination = destination, "Refreshing session before navigation");
            authenticated = self.session.refresh_access_token().await;
        }

        if !authenticated && meta.requires_auth {
            if self.session.has_expired_token() {
                self.session.logout().await;
            }
            return GuardDecision::RedirectToSignIn {
                return_to: destination.to_string(),
            };
        }

        GuardDecision::Proceed
    }
}
