use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::user::UserProfile;
use crate::client::join_url;
use crate::error::{ApiError, ErrorBody};

pub const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid credentials. Please check your email and password.";

/// Sign-in form data
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl RegistrationRequest {
    pub fn new(email: &str, first_name: &str, last_name: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: password.to_string(),
            is_active: true,
            is_superuser: false,
        }
    }
}

/// Token pair returned by `auth/login` and `auth/refresh`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct ResendVerificationRequest<'a> {
    email: &'a str,
}

/// Typed access to the `auth/*` endpoints of the scheduling backend.
/// None of these calls go through the authenticated client.
#[derive(Clone)]
pub struct SessionBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl SessionBackend {
    pub fn new(base_url: String, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// POST auth/login, form-encoded OAuth2 password grant
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, ApiError> {
        let form = [
            ("grant_type", "password"),
            ("username", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
            ("scope", ""),
            ("client_id", ""),
            ("client_secret", ""),
        ];

        let response = self
            .http_client
            .post(join_url(&self.base_url, "auth/login"))
            .header(ACCEPT, "application/json")
            .form(&form[..])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach login endpoint: {}", e);
                ApiError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::UNAUTHORIZED && !ErrorBody::parse(&body).has_detail() {
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()));
        }
        decode(status, &body, "Sign in failed")
    }

    /// POST auth/register
    pub async fn register(&self, request: &RegistrationRequest) -> Result<UserProfile, ApiError> {
        let response = self
            .http_client
            .post(join_url(&self.base_url, "auth/register"))
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode(status, &body, "Registration failed")
    }

    /// POST auth/refresh, exchanging the refresh token for a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        let response = self
            .http_client
            .post(join_url(&self.base_url, "auth/refresh"))
            .header(ACCEPT, "application/json")
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode(status, &body, "Session expired. Please sign in again.")
    }

    /// POST auth/logout, revoking the refresh token
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: &str,
    ) -> Result<(), ApiError> {
        let mut request = self
            .http_client
            .post(join_url(&self.base_url, "auth/logout"))
            .header(ACCEPT, "*/*")
            .json(&RefreshTokenRequest { refresh_token });
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(status, &body, "Logout failed"))
    }

    /// GET auth/me
    pub async fn me(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        let response = self
            .http_client
            .get(join_url(&self.base_url, "auth/me"))
            .header(ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode(status, &body, "Failed to fetch user profile")
    }

    /// POST auth/resend-verification
    pub async fn resend_verification(&self, email: &str) -> Result<(), ApiError> {
        let response = self
            .http_client
            .post(join_url(&self.base_url, "auth/resend-verification"))
            .header(ACCEPT, "application/json")
            .json(&ResendVerificationRequest { email })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(
            status,
            &body,
            "Failed to resend verification email",
        ))
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    status: StatusCode,
    body: &str,
    fallback: &str,
) -> Result<T, ApiError> {
    if !status.is_success() {
        return Err(ApiError::from_response(status, body, fallback));
    }
    Ok(serde_json::from_str(body)?)
}
