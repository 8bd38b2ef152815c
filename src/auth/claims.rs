/// JWT Claims structure
///
/// The subset of a bearer token's payload the client reads. The backend
/// also stamps a token `type` and, for refresh tokens, a `jti`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (the user's email on this backend)
    #[serde(default)]
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// "access" or "refresh"
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Create claims for a token issued now
    ///
    /// # Arguments
    /// * `subject` - Token subject
    /// * `token_type` - "access" or "refresh"
    /// * `lifetime_seconds` - Seconds until expiry; negative values yield an already expired token
    pub fn new(subject: &str, token_type: &str, lifetime_seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: subject.to_string(),
            exp: now + lifetime_seconds,
            iat: now,
            token_type: Some(token_type.to_string()),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// A token is valid only while `exp` is strictly in the future
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Subject, if the token carries a non-empty one
    pub fn subject(&self) -> Option<&str> {
        if self.sub.is_empty() {
            None
        } else {
            Some(&self.sub)
        }
    }
}
