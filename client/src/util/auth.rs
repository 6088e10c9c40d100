//! Route guard and forced sign-out.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every view resolves its navigation through `navigate_to`, so protected
//! views apply identical redirect behavior. The guard itself is a pure
//! function of the session snapshot and the view's requirement; the only
//! side effect lives in `ForcedLogout`, which the transport invokes when the
//! server rejects the credential.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use crate::net::transport::{Credential, UnauthorizedHandler};
use crate::net::types::Role;
use crate::routes::{Access, HOME_ROUTE, LANDING_ROUTE, LOGIN_ROUTE, Route};
use crate::state::auth::{AuthState, SessionStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not yet hydrated; render a placeholder and do not redirect.
    Pending,
    Render,
    RedirectToLogin,
    /// Signed in without the required role.
    Deny,
}

impl GuardDecision {
    /// Where the decision sends the user, if anywhere.
    #[must_use]
    pub fn redirect_target(self) -> Option<Route> {
        match self {
            Self::Pending | Self::Render => None,
            Self::RedirectToLogin => Some(LOGIN_ROUTE),
            Self::Deny => Some(HOME_ROUTE),
        }
    }
}

/// Decide whether a view with `required` may render.
#[must_use]
pub fn evaluate(loading: bool, role: Option<Role>, required: Option<Role>) -> GuardDecision {
    if loading {
        return GuardDecision::Pending;
    }
    let Some(role) = role else {
        return GuardDecision::RedirectToLogin;
    };
    match required {
        Some(required) if required != role => GuardDecision::Deny,
        _ => GuardDecision::Render,
    }
}

#[must_use]
pub fn guard(state: &AuthState, required: Option<Role>) -> GuardDecision {
    evaluate(state.loading, state.role(), required)
}

// =============================================================================
// NAVIGATION
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Wait,
    Render(Route),
    Redirect(Route),
}

/// Resolve a requested path against the route table and the session.
#[must_use]
pub fn navigate_to(state: &AuthState, path: &str) -> Navigation {
    let Some(route) = Route::lookup(path) else {
        return Navigation::Redirect(LANDING_ROUTE);
    };
    let required = match route.access() {
        Access::Public => return Navigation::Render(route),
        Access::Authenticated => None,
        Access::Role(role) => Some(role),
    };

    let decision = guard(state, required);
    match (decision, decision.redirect_target()) {
        (GuardDecision::Pending, _) => Navigation::Wait,
        (_, Some(target)) => Navigation::Redirect(target),
        (_, None) => Navigation::Render(route),
    }
}

/// Moves the user to another view.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Clears the session and returns the user to the login view.
///
/// Subscribe it with `ApiClient::on_unauthorized`. A rejection of a token
/// that has already been replaced is ignored.
pub struct ForcedLogout {
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl ForcedLogout {
    #[must_use]
    pub fn new(store: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }
}

impl UnauthorizedHandler for ForcedLogout {
    fn on_unauthorized(&self, rejected: &Credential) {
        if self.store.invalidate(rejected.generation) {
            self.navigator.navigate(LOGIN_ROUTE.path());
        }
    }
}
