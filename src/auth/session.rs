/// Session Lifecycle
///
/// Sign-in, registration, logout, startup restore and the getters the
/// view and router layers read.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::auth::backend::{Credentials, RegistrationRequest, SessionBackend};
use crate::auth::jwt::{is_expired, token_subject};
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::teardown::SessionTeardown;
use crate::auth::token_store::TokenStore;
use crate::auth::user::{Role, UserProfile, UserUpdate};
use crate::client::LoadingGuard;
use crate::error::ApiError;

pub struct SessionLifecycle {
    store: Arc<TokenStore>,
    backend: Arc<SessionBackend>,
    coordinator: Arc<RefreshCoordinator>,
    teardown: Arc<SessionTeardown>,
    authenticated: AtomicBool,
    loading: AtomicUsize,
    error: Mutex<Option<String>>,
}

impl SessionLifecycle {
    pub fn new(
        store: Arc<TokenStore>,
        backend: Arc<SessionBackend>,
        coordinator: Arc<RefreshCoordinator>,
        teardown: Arc<SessionTeardown>,
    ) -> Self {
        Self {
            store,
            backend,
            coordinator,
            teardown,
            authenticated: AtomicBool::new(false),
            loading: AtomicUsize::new(0),
            error: Mutex::new(None),
        }
    }

    /// Exchange credentials for a token pair and cache the user.
    ///
    /// A failed profile fetch does not fail the sign-in: the cached user
    /// falls back to a minimal record built from the token subject.
    ///
    /// # Errors
    /// Returns the login failure; its message is also kept in `error()`.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        let _loading = LoadingGuard::start(&self.loading);
        self.set_error(None);

        let tokens = match self.backend.login(credentials).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, "Sign in failed");
                self.set_error(Some(e.user_message()));
                return Err(e);
            }
        };

        self.store.set(&tokens.access_token, &tokens.refresh_token);
        self.teardown.rearm();

        let user = match self.fetch_user_profile().await {
            Some(profile) => profile,
            None => {
                let email = token_subject(&tokens.access_token)
                    .unwrap_or_else(|| credentials.email.clone());
                tracing::info!("Using minimal profile from token subject");
                let minimal = UserProfile::minimal(&email);
                self.store.replace_user(minimal.clone());
                minimal
            }
        };

        self.authenticated.store(true, Ordering::SeqCst);
        tracing::info!(email = %user.email, "Signed in");
        Ok(user)
    }

    /// Create an account. The user must verify their email before signing in,
    /// so this caches the returned user without authenticating.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<UserProfile, ApiError> {
        let _loading = LoadingGuard::start(&self.loading);
        self.set_error(None);

        match self.backend.register(request).await {
            Ok(user) => {
                self.store.replace_user(user.clone());
                self.authenticated.store(false, Ordering::SeqCst);
                tracing::info!(email = %user.email, "Registration accepted, awaiting verification");
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Registration failed");
                self.set_error(Some(e.user_message()));
                Err(e)
            }
        }
    }

    pub async fn resend_verification_email(&self, email: &str) -> Result<(), ApiError> {
        let _loading = LoadingGuard::start(&self.loading);
        self.set_error(None);

        self.backend.resend_verification(email).await.map_err(|e| {
            self.set_error(Some(e.user_message()));
            e
        })
    }

    /// Fetch `auth/me` with the current access token and cache it
    pub async fn fetch_user_profile(&self) -> Option<UserProfile> {
        let token = self.store.access_token()?;

        match self.backend.me(&token).await {
            Ok(profile) => {
                self.store.replace_user(profile.clone());
                Some(profile)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch user profile");
                None
            }
        }
    }

    /// Revoke the session on the backend if possible, then clear it locally.
    /// Safe to call without a session.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.refresh_token() {
            let access_token = self.store.access_token();
            if let Err(e) = self
                .backend
                .logout(access_token.as_deref(), &refresh_token)
                .await
            {
                tracing::warn!(error = %e, "Backend logout failed");
            }
        }

        self.store.clear();
        self.authenticated.store(false, Ordering::SeqCst);
        self.set_error(None);
        tracing::info!("Logged out");
    }

    /// Clear the session and send the user to sign-in
    pub fn teardown(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
        self.teardown.run(None);
    }

    /// Force a refresh through the shared coordinator
    pub async fn refresh_access_token(&self) -> bool {
        match self.coordinator.refresh(None).await {
            Ok(_) => {
                self.authenticated.store(true, Ordering::SeqCst);
                self.fetch_user_profile().await;
                true
            }
            Err(e) => {
                self.authenticated.store(false, Ordering::SeqCst);
                self.set_error(Some(e.user_message()));
                false
            }
        }
    }

    /// Restore a persisted session at startup
    pub async fn initialize(&self) -> bool {
        let tokens = self.store.get();
        let (Some(access_token), Some(_)) = (tokens.access_token, tokens.refresh_token) else {
            tracing::debug!("No persisted session to restore");
            return false;
        };

        self.teardown.rearm();
        if !is_expired(&access_token) {
            self.authenticated.store(true, Ordering::SeqCst);
            if self.fetch_user_profile().await.is_none() {
                tracing::warn!("Failed to fetch user profile on initialization");
            }
            return true;
        }

        tracing::info!("Persisted access token expired, refreshing");
        if self.refresh_access_token().await {
            true
        } else {
            self.logout().await;
            false
        }
    }

    /// Signed in with an access token that has not expired
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst) && self.has_valid_token()
    }

    /// An unexpired access token is stored, whether or not the flag is set
    pub fn has_valid_token(&self) -> bool {
        self.store
            .access_token()
            .map_or(false, |token| !is_expired(&token))
    }

    pub fn has_expired_token(&self) -> bool {
        self.store
            .access_token()
            .map_or(false, |token| is_expired(&token))
    }

    pub fn can_refresh_token(&self) -> bool {
        self.store.refresh_token().is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.store
            .get_user()
            .map_or(false, |user| user.has_role(role))
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.store.get_user()
    }

    pub fn set_user(&self, update: UserUpdate) {
        self.store.set_user(update);
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    fn set_error(&self, message: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }
}
