//! Shared fakes for unit tests: scripted auth API, canned HTTP server,
//! recording navigator, and sample identities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::net::api::{AuthApi, AuthApiError};
use crate::net::types::{AuthResponse, Identity, LoginRequest, RegisterProfile, Role};
use crate::util::auth::Navigator;

#[must_use]
pub fn identity(role: Role) -> Identity {
    Identity {
        id: 1,
        username: format!("{}-user", role.as_str().to_ascii_lowercase()),
        email: "user@auca.ac.rw".to_owned(),
        first_name: "Test".to_owned(),
        last_name: role.label().to_owned(),
        role,
        lab_id: None,
    }
}

#[must_use]
pub fn auth_response(role: Role, token: &str) -> AuthResponse {
    AuthResponse { token: token.to_owned(), identity: identity(role) }
}

#[must_use]
pub fn register_profile() -> RegisterProfile {
    RegisterProfile {
        username: "newstudent".to_owned(),
        email: "new@auca.ac.rw".to_owned(),
        password: "secret123".to_owned(),
        first_name: "New".to_owned(),
        last_name: "Student".to_owned(),
        lab_id: None,
    }
}

// =============================================================================
// SCRIPTED AUTH API
// =============================================================================

/// Replays queued results in order; records every call.
#[derive(Default)]
pub struct MockAuthApi {
    responses: Mutex<VecDeque<Result<AuthResponse, AuthApiError>>>,
    pub logins: Mutex<Vec<LoginRequest>>,
    pub registrations: Mutex<Vec<RegisterProfile>>,
    /// When set, each call signals `entered` then waits on `release`.
    pub gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl MockAuthApi {
    #[must_use]
    pub fn new(responses: Vec<Result<AuthResponse, AuthApiError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), ..Self::default() }
    }

    #[must_use]
    pub fn gated(responses: Vec<Result<AuthResponse, AuthApiError>>, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self { gate: Some((entered, release)), ..Self::new(responses) }
    }

    pub fn call_count(&self) -> usize {
        self.logins.lock().unwrap().len() + self.registrations.lock().unwrap().len()
    }

    async fn next(&self) -> Result<AuthResponse, AuthApiError> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthApiError::Transport("no scripted response".to_owned())))
    }
}

#[async_trait::async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthApiError> {
        self.logins.lock().unwrap().push(request.clone());
        self.next().await
    }

    async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, AuthApiError> {
        self.registrations.lock().unwrap().push(profile.clone());
        self.next().await
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    pub visited: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_owned());
    }
}

// =============================================================================
// CANNED HTTP SERVER
// =============================================================================

/// Answer exactly one HTTP request with `status_line` and `body`.
///
/// Returns the base URL and a handle resolving to the raw request, head and
/// body.
pub async fn serve_once(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0_u8; 1024];
        let head_end = loop {
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break raw.len();
            }
            raw.extend_from_slice(&buf[..n]);
        };
        let body_len = content_length(&String::from_utf8_lossy(&raw[..head_end]));
        while raw.len() < head_end + body_len {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).into_owned()
    });

    (format!("http://{addr}/api"), handle)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}
