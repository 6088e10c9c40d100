//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionStore` is the single owner of "who is using this client". Route
//! guards read `AuthState` snapshots from it; the transport reads the token
//! from it and reports authorization failures back to it.
//!
//! DESIGN
//! ======
//! The in-memory identity and the persisted `token`/`user` pair change
//! together under one write lock, so no completed operation leaves them
//! disagreeing. Every session-mutating call bumps an epoch when it starts;
//! a login or register response is applied only if the epoch it captured is
//! still current. A response that lands after a logout, or after a newer
//! sign-in attempt began, is discarded.
//!
//! A separate generation counter moves whenever the token changes. The
//! transport tags each request with it, so a 401 for a token that has since
//! been replaced cannot sign out the newer session.
//!
//! ERROR HANDLING
//! ==============
//! `login` and `register` never return `Err`: every failure becomes
//! `AuthOutcome::Failure` with a message fit for display.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::permissions::Permissions;
use crate::net::api::{AuthApi, AuthApiError};
use crate::net::transport::{Credential, CredentialSource};
use crate::net::types::{AuthResponse, Identity, LoginRequest, RegisterProfile, Role};
use crate::util::persistence::{self, PersistedSession, SessionStorage};
use crate::util::validation;

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const SESSION_CHANGED: &str = "Session changed before sign-in completed";

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Immutable view of the session at one instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Identity>,
    /// True until the persisted copy has been read.
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self { user: None, loading: true }
    }
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    #[must_use]
    pub fn is_lab_manager(&self) -> bool {
        self.role() == Some(Role::LabManager)
    }

    #[must_use]
    pub fn is_instructor(&self) -> bool {
        self.role() == Some(Role::Instructor)
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.role() == Some(Role::Student)
    }

    #[must_use]
    pub fn permissions(&self) -> Permissions {
        Permissions::for_session(self.role())
    }

    /// A booking may be cancelled by its owner or by an admin.
    #[must_use]
    pub fn can_cancel_booking(&self, owner_id: i64) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.id == owner_id || user.role == Role::Admin)
    }
}

/// Result of a sign-in attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Success(Identity),
    Failure(String),
}

impl AuthOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug)]
struct Session {
    user: Option<Identity>,
    token: Option<String>,
    loading: bool,
    epoch: u64,
    generation: u64,
    in_flight: usize,
}

struct Inner {
    storage: Arc<dyn SessionStorage>,
    api: Arc<dyn AuthApi>,
    session: RwLock<Session>,
}

/// Shared handle to the session; clones observe the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

#[derive(Clone, Copy)]
enum Attempt {
    Login,
    Register,
}

impl Attempt {
    fn fallback(self) -> &'static str {
        match self {
            Self::Login => LOGIN_FAILED,
            Self::Register => REGISTRATION_FAILED,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

impl SessionStore {
    /// Empty, still-loading session. Call [`SessionStore::hydrate`] next.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>, api: Arc<dyn AuthApi>) -> Self {
        let session = Session { user: None, token: None, loading: true, epoch: 0, generation: 0, in_flight: 0 };
        Self { inner: Arc::new(Inner { storage, api, session: RwLock::new(session) }) }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        let session = self.read();
        AuthState { user: session.user.clone(), loading: session.loading }
    }

    /// Advisory: a login or register call is awaiting the server.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.read().in_flight > 0
    }

    /// Adopt the persisted session, if any, without contacting the server.
    ///
    /// Only the first call while loading does anything. A torn or malformed
    /// persisted copy is cleared and the session stays empty.
    pub fn hydrate(&self) {
        let mut session = self.write();
        if !session.loading {
            tracing::debug!("session already hydrated");
            return;
        }

        match persistence::load_session(self.inner.storage.as_ref()) {
            PersistedSession::Valid { token, identity } => {
                tracing::info!(user = %identity.username, role = %identity.role, "session restored");
                session.user = Some(identity);
                session.token = Some(token);
                session.generation += 1;
            }
            PersistedSession::Empty => tracing::debug!("no persisted session"),
            PersistedSession::Invalid(reason) => {
                tracing::warn!(%reason, "discarding invalid persisted session");
                if let Err(e) = persistence::clear_session(self.inner.storage.as_ref()) {
                    tracing::warn!(error = %e, "failed to clear invalid persisted session");
                }
            }
        }
        session.loading = false;
    }

    /// Sign in with username and password.
    pub async fn login(&self, username: &str, password: &str) -> AuthOutcome {
        if let Err(message) = validation::validate_login(username, password) {
            return AuthOutcome::Failure(message);
        }
        let request = LoginRequest { username: username.trim().to_owned(), password: password.to_owned() };

        let epoch = self.begin_attempt();
        let result = self.inner.api.login(&request).await;
        self.finish_attempt(Attempt::Login, epoch, result)
    }

    /// Create an account and sign in as it.
    pub async fn register(&self, profile: RegisterProfile) -> AuthOutcome {
        if let Err(message) = validation::validate_registration(&profile) {
            return AuthOutcome::Failure(message);
        }

        let epoch = self.begin_attempt();
        let result = self.inner.api.register(&profile).await;
        self.finish_attempt(Attempt::Register, epoch, result)
    }

    /// Clear the persisted pair and the in-memory identity. Idempotent.
    pub fn logout(&self) {
        if let Some(username) = self.clear() {
            tracing::info!(user = %username, "signed out");
        }
    }

    /// Forced sign-out after the server rejected the credential issued at
    /// `generation`.
    ///
    /// Returns `false` without touching anything when the session has been
    /// replaced or cleared since that credential was handed out.
    pub fn invalidate(&self, generation: u64) -> bool {
        let mut session = self.write();
        if session.generation != generation {
            tracing::debug!(rejected = generation, current = session.generation, "ignoring stale authorization failure");
            return false;
        }
        if let Some(username) = self.clear_locked(&mut session) {
            tracing::warn!(user = %username, "session invalidated by server");
        }
        true
    }

    /// The current bearer token, if signed in.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.read().token.clone()
    }

    fn clear(&self) -> Option<String> {
        self.clear_locked(&mut self.write())
    }

    fn clear_locked(&self, session: &mut Session) -> Option<String> {
        session.epoch += 1;
        session.generation += 1;
        session.loading = false;
        session.token = None;
        let previous = session.user.take().map(|user| user.username);
        if let Err(e) = persistence::clear_session(self.inner.storage.as_ref()) {
            tracing::error!(error = %e, "failed to clear persisted session");
        }
        previous
    }

    fn begin_attempt(&self) -> u64 {
        let mut session = self.write();
        session.epoch += 1;
        session.in_flight += 1;
        session.epoch
    }

    fn finish_attempt(&self, attempt: Attempt, epoch: u64, result: Result<AuthResponse, AuthApiError>) -> AuthOutcome {
        let mut session = self.write();
        session.in_flight = session.in_flight.saturating_sub(1);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(attempt = attempt.name(), error = %e, "sign-in failed");
                let message = e.server_message().unwrap_or(attempt.fallback()).to_owned();
                return AuthOutcome::Failure(message);
            }
        };

        if session.epoch != epoch {
            tracing::warn!(attempt = attempt.name(), "discarding stale sign-in response");
            return AuthOutcome::Failure(SESSION_CHANGED.to_owned());
        }

        let AuthResponse { token, identity } = response;
        if let Err(e) = persistence::save_session(self.inner.storage.as_ref(), &token, &identity) {
            tracing::error!(attempt = attempt.name(), error = %e, "failed to persist session");
            return AuthOutcome::Failure(format!("{}: {e}", attempt.fallback()));
        }

        tracing::info!(attempt = attempt.name(), user = %identity.username, role = %identity.role, "signed in");
        session.user = Some(identity.clone());
        session.token = Some(token);
        session.generation += 1;
        session.loading = false;
        AuthOutcome::Success(identity)
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialSource for SessionStore {
    fn credential(&self) -> Credential {
        let session = self.read();
        Credential { token: session.token.clone(), generation: session.generation }
    }
}
