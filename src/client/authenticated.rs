/// Authenticated Client
///
/// Request façade shared by every consumer. For paths that need a
/// session it:
/// - attaches `Authorization: Bearer <access_token>`
/// - refreshes proactively when the stored token is already expired
/// - on a 401, refreshes through the coordinator and replays the
///   request exactly once
/// - tears the session down when no token is available at all

use std::sync::Arc;

use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::Instrument;

use crate::auth::{is_expired, RefreshCoordinator, SessionTeardown, TokenStore};
use crate::client::join_url;
use crate::error::{ApiError, ErrorContext, DEFAULT_ERROR_MESSAGE};

/// Paths that never carry a bearer token and never trigger a refresh
pub const UNAUTHENTICATED_ENDPOINTS: [&str; 3] = ["auth/login", "auth/register", "auth/refresh"];

/// Whether `path` is exempt from the auth pre/post logic.
/// Matching ignores the query string and a trailing slash.
pub fn is_unauthenticated_path(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    UNAUTHENTICATED_ENDPOINTS
        .iter()
        .any(|endpoint| path.contains(endpoint))
}

/// A logical request, kept whole so it can be replayed verbatim
#[derive(Debug, Clone)]
struct PreparedRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    authenticated: bool,
    retried: bool,
}

/// Result of handling one response
#[derive(Debug)]
enum Outcome {
    Success(Value),
    RetryNeeded,
    Failure(ApiError),
}

pub struct AuthenticatedClient {
    http_client: reqwest::Client,
    base_url: String,
    store: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
    teardown: Arc<SessionTeardown>,
}

impl AuthenticatedClient {
    pub fn new(
        base_url: String,
        http_client: reqwest::Client,
        store: Arc<TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
        teardown: Arc<SessionTeardown>,
    ) -> Self {
        Self {
            http_client,
            base_url,
            store,
            coordinator,
            teardown,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None, false).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.request(Method::POST, path, body, false).await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, body, false).await
    }

    pub async fn patch(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.request(Method::PATCH, path, body, false).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, None, false).await
    }

    /// Issue a request, refreshing and replaying as needed.
    ///
    /// # Arguments
    /// * `skip_auth` - Send without a token and without refresh handling
    ///
    /// # Errors
    /// `NoSession` / `RefreshFailure` after the session was torn down,
    /// `Unauthorized` when the replay is rejected too, otherwise the
    /// classified backend or transport failure.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        skip_auth: bool,
    ) -> Result<Value, ApiError> {
        let context = ErrorContext::new(format!("{} {}", method, path));
        let span = tracing::info_span!(
            "api_request",
            request_id = %context.request_id,
            method = %method,
            path = %path,
        );

        let request = PreparedRequest {
            method,
            path: path.to_string(),
            body,
            authenticated: !skip_auth && !is_unauthenticated_path(path),
            retried: false,
        };

        let result = self.run(request).instrument(span).await;
        if let Err(e) = &result {
            context.log_error(e);
        }
        result
    }

    async fn run(&self, mut request: PreparedRequest) -> Result<Value, ApiError> {
        let mut token = if request.authenticated {
            Some(self.ensure_valid_token().await?)
        } else {
            None
        };

        loop {
            match self.dispatch(&request, token.as_deref()).await {
                Outcome::Success(value) => return Ok(value),
                Outcome::Failure(e) => return Err(e),
                Outcome::RetryNeeded => {
                    let fresh = self.coordinator.refresh(token.as_deref()).await?;
                    tracing::debug!("Replaying request with refreshed token");
                    token = Some(fresh);
                    request.retried = true;
                }
            }
        }
    }

    /// Current access token, refreshed first if it has already expired
    async fn ensure_valid_token(&self) -> Result<String, ApiError> {
        let Some(token) = self.store.access_token() else {
            tracing::warn!("No access token for authenticated request");
            self.teardown.run(None);
            return Err(ApiError::NoSession);
        };

        if !is_expired(&token) {
            return Ok(token);
        }

        tracing::debug!("Access token expired, refreshing before request");
        self.coordinator.refresh(Some(&token)).await
    }

    async fn dispatch(&self, request: &PreparedRequest, token: Option<&str>) -> Outcome {
        let mut builder = self
            .http_client
            .request(request.method.clone(), join_url(&self.base_url, &request.path))
            .header(ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::Failure(e.into()),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::Failure(e.into()),
        };

        tracing::debug!(status = status.as_u16(), retried = request.retried, "Response received");

        if status.is_success() {
            return decode_success(&body);
        }

        if status == StatusCode::UNAUTHORIZED && request.authenticated && !request.retried {
            return Outcome::RetryNeeded;
        }

        Outcome::Failure(ApiError::from_response(status, &body, DEFAULT_ERROR_MESSAGE))
    }
}

fn decode_success(body: &str) -> Outcome {
    if body.trim().is_empty() {
        return Outcome::Success(Value::Null);
    }
    match serde_json::from_str(body) {
        Ok(value) => Outcome::Success(value),
        Err(e) => Outcome::Failure(e.into()),
    }
}
