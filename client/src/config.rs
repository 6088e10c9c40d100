//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const SESSION_FILE_NAME: &str = "session.json";
const APP_DIR_NAME: &str = "labdesk";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API base URL '{0}' (expected http:// or https://)")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root without a trailing slash, e.g. `http://localhost:8080/api`.
    pub api_base_url: String,
    /// Where the file-backed session storage lives.
    pub session_file: PathBuf,
    pub timeouts: HttpTimeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `LABDESK_API_BASE_URL`: default `http://localhost:8080/api`
    /// - `LABDESK_SESSION_FILE`: default `<config dir>/labdesk/session.json`
    /// - `LABDESK_REQUEST_TIMEOUT_SECS`: default 30
    /// - `LABDESK_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the base URL has no http(s) scheme.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = std::env::var("LABDESK_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());
        let session_file = std::env::var_os("LABDESK_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(default_session_file);
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("LABDESK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("LABDESK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        Self::new(&api_base_url, session_file, timeouts)
    }

    /// Build config from explicit values, normalizing the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the base URL has no http(s) scheme.
    pub fn new(api_base_url: &str, session_file: PathBuf, timeouts: HttpTimeouts) -> Result<Self, ConfigError> {
        let api_base_url = normalize_base_url(api_base_url)?;
        Ok(Self { api_base_url, session_file, timeouts })
    }
}

/// Platform config dir when known, else a dot-directory under the cwd.
#[must_use]
pub fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".labdesk"))
        .join(SESSION_FILE_NAME)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_owned())
    } else {
        Err(ConfigError::InvalidBaseUrl(raw.to_owned()))
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
