//! Authentication endpoints: `POST /auth/login` and `POST /auth/register`.
//!
//! DESIGN
//! ======
//! `AuthApi` is the network seam the session store talks to, so store logic
//! can be exercised with in-process fakes. `HttpAuthApi` is the `reqwest`
//! implementation; response interpretation lives in `parse_auth_response`
//! so it can be tested without a server.
//!
//! ERROR HANDLING
//! ==============
//! These calls go out without a bearer token and never trigger the
//! transport's unauthorized broadcast: a rejected login is an ordinary
//! failure, not an expired session.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::types::{AuthResponse, LoginRequest, RegisterProfile, envelope_reports_failure, error_message, unwrap_envelope};
use crate::config::ClientConfig;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";

/// Errors produced by the authentication endpoints.
#[derive(Debug, thiserror::Error)]
pub enum AuthApiError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status or `success: false`.
    #[error("rejected by server (status {status})")]
    Rejected { status: u16, message: Option<String> },

    /// A success response whose payload could not be understood.
    #[error("unexpected auth response: {0}")]
    Malformed(String),
}

impl AuthApiError {
    /// The server-supplied message, when the error payload carried one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Remote authentication operations used by the session store.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token and identity.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthApiError`] on transport failure, rejection, or a
    /// malformed payload.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthApiError>;

    /// Create an account; a successful registration also signs the user in.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthApiError`] on transport failure, rejection, or a
    /// malformed payload.
    async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, AuthApiError>;
}

// =============================================================================
// HTTP IMPLEMENTATION
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Build a client honoring the configured base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`AuthApiError::HttpClientBuild`] if `reqwest` cannot build a client.
    pub fn new(config: &ClientConfig) -> Result<Self, AuthApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AuthApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self::with_client(http, config.api_base_url.clone()))
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<AuthResponse, AuthApiError> {
        let url = endpoint(&self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AuthApiError::Transport(e.to_string()))?;

        tracing::debug!(%url, status, "auth endpoint responded");
        parse_auth_response(status, &text)
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthApiError> {
        self.post(LOGIN_PATH, request).await
    }

    async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, AuthApiError> {
        self.post(REGISTER_PATH, profile).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Join the API root and an endpoint path with exactly one slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Interpret an auth endpoint response.
///
/// Non-2xx statuses and `success: false` envelopes are rejections carrying
/// the payload's `message`. A 2xx body must contain a non-empty token and a
/// complete identity, either bare or under `data`.
fn parse_auth_response(status: u16, body: &str) -> Result<AuthResponse, AuthApiError> {
    let value = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);

    if !(200..300).contains(&status) || envelope_reports_failure(&value) {
        return Err(AuthApiError::Rejected { status, message: error_message(&value) });
    }

    let payload = unwrap_envelope(value);
    let parsed: AuthResponse =
        serde_json::from_value(payload).map_err(|e| AuthApiError::Malformed(e.to_string()))?;
    if parsed.token.trim().is_empty() {
        return Err(AuthApiError::Malformed("empty token".to_owned()));
    }
    Ok(parsed)
}
