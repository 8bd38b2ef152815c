/// Authentication module
///
/// Token decoding, the token store and its storage port, the refresh
/// coordinator and the session lifecycle.

mod backend;
mod claims;
mod jwt;
mod refresh;
mod session;
mod storage;
mod teardown;
mod token_store;
mod user;

pub use backend::{
    Credentials, RegistrationRequest, SessionBackend, TokenResponse, INVALID_CREDENTIALS_MESSAGE,
};
pub use claims::Claims;
pub use jwt::{decode_token, expiry_time, is_expired, is_expired_at, token_subject};
pub use refresh::RefreshCoordinator;
pub use session::SessionLifecycle;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use teardown::SessionTeardown;
pub use token_store::{
    TokenPair, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SNAPSHOT_KEY, USER_KEY,
};
pub use user::{Role, UserProfile, UserUpdate};
