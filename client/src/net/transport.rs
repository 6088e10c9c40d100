//! Authenticated JSON transport for every non-auth endpoint.
//!
//! SYSTEM CONTEXT
//! ==============
//! Feature code (labs, equipment, bookings, ...) calls the API through
//! `ApiClient`. The client attaches the current bearer token and, when the
//! server answers 401, notifies every subscribed `UnauthorizedHandler`
//! before returning the error. The session side subscribes a forced-logout
//! handler, so an expired token anywhere returns the user to the login view.
//!
//! ERROR HANDLING
//! ==============
//! Only 401 is treated as an authorization failure. 403 means the session is
//! valid but under-privileged and is returned as `Forbidden` without touching
//! the session.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::api::endpoint;
use super::types::{envelope_reports_failure, error_message, unwrap_envelope};
use crate::config::ClientConfig;

/// Errors produced by authenticated API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("request failed: {0}")]
    Transport(String),

    /// Credential rejected or expired (HTTP 401).
    #[error("not authorized; please sign in again")]
    Unauthorized,

    /// Signed in, but the role may not perform this call (HTTP 403).
    #[error("forbidden: {}", message.as_deref().unwrap_or("insufficient role"))]
    Forbidden { message: Option<String> },

    #[error("server returned {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("response decode failed: {0}")]
    Decode(String),
}

/// The token a request was sent with, tagged with the session generation
/// that issued it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credential {
    pub token: Option<String>,
    pub generation: u64,
}

/// Supplies the credential for outgoing requests.
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> Credential;
}

/// Callback invoked when any call is answered with an authorization failure.
///
/// `rejected` is the credential the failing request carried; the session may
/// have changed while the request was in flight.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self, rejected: &Credential);
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
    unauthorized: RwLock<Vec<Arc<dyn UnauthorizedHandler>>>,
}

impl ApiClient {
    /// Build a client honoring the configured base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if `reqwest` cannot build a client.
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self::with_client(http, config.api_base_url.clone(), credentials))
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: String, credentials: Arc<dyn CredentialSource>) -> Self {
        Self { http, base_url, credentials, unauthorized: RwLock::new(Vec::new()) }
    }

    /// Subscribe a handler to authorization failures from any call.
    pub fn on_unauthorized(&self, handler: Arc<dyn UnauthorizedHandler>) {
        self.unauthorized
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(handler);
    }

    /// Send a request and return the unwrapped JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-success
    /// responses. [`ApiError::Unauthorized`] is returned after subscribed
    /// handlers have run.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let url = endpoint(&self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        let credential = self.credentials.credential();
        if let Some(token) = &credential.token {
            request = request.bearer_auth(token);
        }
        if let Some(json) = body {
            request = request.json(&json);
        }

        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        tracing::debug!(%method, %url, status, "api call completed");

        let result = classify_response(status, &text);
        if matches!(result, Err(ApiError::Unauthorized)) {
            tracing::warn!(%url, "authorization rejected; invalidating session");
            self.notify_unauthorized(&credential);
        }
        result
    }

    /// `GET` and decode the payload into `T`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`]; also [`ApiError::Decode`] if the payload
    /// does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request(Method::GET, path, None).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn notify_unauthorized(&self, rejected: &Credential) {
        let handlers = self
            .unauthorized
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler.on_unauthorized(rejected);
        }
    }
}

/// Map a raw response onto the payload or a typed error.
fn classify_response(status: u16, body: &str) -> Result<Value, ApiError> {
    let value = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_owned()))
    };

    match status {
        401 => Err(ApiError::Unauthorized),
        403 => Err(ApiError::Forbidden { message: error_message(&value) }),
        200..=299 if envelope_reports_failure(&value) => {
            Err(ApiError::Status { status, message: error_message(&value) })
        }
        200..=299 => Ok(unwrap_envelope(value)),
        _ => Err(ApiError::Status { status, message: error_message(&value) }),
    }
}
