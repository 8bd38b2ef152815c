/// Bearer token decoding
///
/// Reads the claims of a JWT without verifying its signature. This is
/// an expiry check and display helper, never a trust boundary: the
/// backend remains the only party that validates tokens.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::auth::claims::Claims;

fn unverified() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Decode the payload segment of a token
///
/// Returns `None` for anything that is not a three-segment token with
/// a URL-safe base64 JSON payload carrying an `exp` claim.
pub fn decode_token(token: &str) -> Option<Claims> {
    if token.split('.').count() != 3 {
        return None;
    }

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &unverified())
        .map(|data| data.claims)
        .map_err(|e| tracing::debug!("Token could not be decoded: {}", e))
        .ok()
}

/// Whether `token` is expired at `now` (Unix seconds). Undecodable tokens are expired.
pub fn is_expired_at(token: &str, now: i64) -> bool {
    decode_token(token).map_or(true, |claims| claims.is_expired_at(now))
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now().timestamp())
}

pub fn expiry_time(token: &str) -> Option<DateTime<Utc>> {
    decode_token(token).and_then(|claims| claims.expires_at())
}

pub fn token_subject(token: &str) -> Option<String> {
    decode_token(token).and_then(|claims| claims.subject().map(str::to_string))
}
