/// Token Store
///
/// Single owner of the session: access token, refresh token and the
/// cached user. Every write goes through `set`/`clear`, which update
/// the pair under one lock so readers never see half a rotation.
/// Durable storage is best-effort; failures are logged and the
/// in-memory state stays authoritative.

use std::sync::{Arc, PoisonError, RwLock};

use crate::auth::storage::{KeyValueStorage, MemoryStorage};
use crate::auth::user::{UserProfile, UserUpdate};

pub const ACCESS_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
/// Persisted session snapshot written by older dashboard builds
pub const SNAPSHOT_KEY: &str = "auth";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    tokens: TokenPair,
    user: Option<UserProfile>,
}

pub struct TokenStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn KeyValueStorage>,
}

impl TokenStore {
    /// Empty store writing through to `storage`
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            storage,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Hydrate from whatever `storage` already holds
    pub fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        let read = |key: &str| {
            storage.get(key).unwrap_or_else(|e| {
                tracing::warn!(key = key, error = %e, "Failed to read persisted session");
                None
            })
        };

        let tokens = TokenPair {
            access_token: read(ACCESS_TOKEN_KEY),
            refresh_token: read(REFRESH_TOKEN_KEY),
        };
        let user = read(USER_KEY).and_then(|raw| {
            serde_json::from_str::<UserProfile>(&raw)
                .map_err(|e| tracing::warn!(error = %e, "Discarding unreadable cached user"))
                .ok()
        });

        tracing::debug!(
            has_access_token = tokens.access_token.is_some(),
            has_refresh_token = tokens.refresh_token.is_some(),
            has_user = user.is_some(),
            "Session loaded from storage"
        );

        Self {
            state: RwLock::new(SessionState { tokens, user }),
            storage,
        }
    }

    pub fn get(&self) -> TokenPair {
        self.read_state().tokens.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_state().tokens.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_state().tokens.refresh_token.clone()
    }

    /// Replace both tokens
    pub fn set(&self, access_token: &str, refresh_token: &str) {
        let mut state = self.write_state();
        state.tokens = TokenPair {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
        };
        self.persist(ACCESS_TOKEN_KEY, Some(access_token));
        self.persist(REFRESH_TOKEN_KEY, Some(refresh_token));
    }

    /// Drop tokens, cached user and the persisted snapshot. Idempotent.
    pub fn clear(&self) {
        let mut state = self.write_state();
        *state = SessionState::default();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY, SNAPSHOT_KEY] {
            self.persist(key, None);
        }
    }

    pub fn get_user(&self) -> Option<UserProfile> {
        self.read_state().user.clone()
    }

    pub fn replace_user(&self, user: UserProfile) {
        let mut state = self.write_state();
        self.persist_user(&user);
        state.user = Some(user);
    }

    /// Merge `update` into the cached user; no-op when no user is cached
    pub fn set_user(&self, update: UserUpdate) {
        let mut state = self.write_state();
        if let Some(user) = state.user.as_mut() {
            user.merge(update);
            let snapshot = user.clone();
            self.persist_user(&snapshot);
        }
    }

    fn persist_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(raw) => self.persist(USER_KEY, Some(&raw)),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize cached user"),
        }
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!(key = key, error = %e, "Failed to persist session state");
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
