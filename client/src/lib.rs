//! # labdesk-client
//!
//! Session and access-control core for the lab management client.
//!
//! This crate owns "who is signed in": the persisted session, the sign-in
//! calls against the lab API, the authenticated JSON transport, and the
//! route guard that decides whether a view may render. It has no UI of its
//! own; a front end passes the [`state::auth::SessionStore`] handle to
//! whatever needs identity or role information.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Environment-driven client configuration |
//! | [`net`] | Wire types, auth endpoints, authenticated transport |
//! | [`routes`] | Route table and per-role dashboards |
//! | [`state`] | Session store and derived permissions |
//! | [`util`] | Route guard, session persistence, form validation |

pub mod config;
pub mod net;
pub mod routes;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ClientConfig;
pub use net::types::{Identity, Role};
pub use state::auth::{AuthOutcome, AuthState, SessionStore};
