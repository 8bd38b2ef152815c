/// Error Handling Module
///
/// Every failure the session client can produce is an `ApiError`.
/// It covers:
/// 1. Storage Errors (durable key-value port)
/// 2. Backend Error Bodies (structured `detail` / `message` shapes)
/// 3. The Client Error Taxonomy (session, validation, network, generic)
/// 4. Structured Error Logging with Context

use reqwest::StatusCode;
use serde::Deserialize;
use std::error::Error as StdError;
use std::fmt;

/// Message used when nothing more specific can be extracted
pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Message for HTTP 500 responses without a usable body
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

/// ============================================================================
/// 1. STORAGE ERRORS
/// ============================================================================

/// Failures of the durable key-value storage port
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    Io(String),
    Serialization(String),
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "Storage I/O error: {}", msg),
            StorageError::Serialization(msg) => write!(f, "Storage format error: {}", msg),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

impl StdError for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// ============================================================================
/// 2. BACKEND ERROR BODIES
/// ============================================================================

/// One entry of a structured validation response (`{"detail": [...]}`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl FieldError {
    /// Name of the offending field: the last element of `loc`
    pub fn field(&self) -> Option<String> {
        self.loc.last().map(|segment| match segment {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Fields(Vec<FieldError>),
}

/// Error payload shapes the backend is known to return
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    detail: Option<Detail>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    /// Parse a response body; anything unrecognised yields an empty body
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub fn has_detail(&self) -> bool {
        self.detail.is_some()
    }
}

/// ============================================================================
/// 3. CLIENT ERROR TAXONOMY
/// ============================================================================

/// Every failure surfaced by the authenticated client and session lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No access token is present and the path requires one
    NoSession,
    /// The backend still answered 401 after the single permitted retry
    Unauthorized(String),
    /// The refresh exchange failed or no refresh token was available
    RefreshFailure(String),
    /// Structured per-field validation errors
    Validation(Vec<FieldError>),
    /// Transport-level failure
    Network(String),
    /// Non-success status carrying a readable message
    Server { status: u16, message: String },
    /// Anything else, including undecodable payloads
    Unknown(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NoSession => write!(f, "No authentication token found"),
            ApiError::Unauthorized(msg) => write!(f, "{}", msg),
            ApiError::RefreshFailure(msg) => write!(f, "Session expired: {}", msg),
            ApiError::Validation(fields) => {
                let messages = fields
                    .iter()
                    .map(|e| e.msg.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}", messages)
            }
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Server { message, .. } => write!(f, "{}", message),
            ApiError::Unknown(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for ApiError {}

impl ApiError {
    /// Classify a non-success response.
    ///
    /// # Arguments
    /// * `status` - HTTP status of the response
    /// * `body` - Raw response body
    /// * `fallback` - Message used when the body carries nothing readable
    pub fn from_response(status: StatusCode, body: &str, fallback: &str) -> Self {
        let parsed = ErrorBody::parse(body);

        let message = match parsed.detail {
            Some(Detail::Fields(fields)) if !fields.is_empty() => {
                return ApiError::Validation(fields);
            }
            Some(Detail::Text(text)) => Some(text),
            _ => parsed.message,
        };

        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized(
                message.unwrap_or_else(|| "Invalid or expired token".to_string()),
            );
        }

        let message = match message {
            Some(text) => text,
            None if status == StatusCode::INTERNAL_SERVER_ERROR => SERVER_ERROR_MESSAGE.to_string(),
            None => fallback.to_string(),
        };

        ApiError::Server {
            status: status.as_u16(),
            message,
        }
    }

    /// Human-readable message suitable for a toast or form banner
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(fields) if fields.is_empty() => DEFAULT_ERROR_MESSAGE.to_string(),
            ApiError::RefreshFailure(_) => "Session expired. Please sign in again.".to_string(),
            other => other.to_string(),
        }
    }

    /// Failures already handled by session teardown
    pub fn is_session_failure(&self) -> bool {
        matches!(self, ApiError::NoSession | ApiError::RefreshFailure(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Unknown(format!("Failed to parse response: {}", err))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Unknown(format!("Unexpected response shape: {}", err))
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn log_error(&self, error: &ApiError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            ApiError::NoSession | ApiError::RefreshFailure(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Session unavailable"
                );
            }
            ApiError::Unauthorized(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Authentication error"
                );
            }
            ApiError::Validation(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Validation error"
                );
            }
            ApiError::Network(_) => {
                tracing::error!(
                    error = %error,
                    context = ?context,
                    "Network error"
                );
            }
            ApiError::Server { status, .. } => {
                tracing::error!(
                    status = status,
                    error = %error,
                    context = ?context,
                    "Backend error"
                );
            }
            ApiError::Unknown(_) => {
                tracing::error!(
                    error = %error,
                    context = ?context,
                    "Unexpected error"
                );
            }
        }
    }
}
