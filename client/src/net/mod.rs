//! Networking modules for the lab API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles the unauthenticated sign-in calls, `transport` carries every
//! other request with the session's bearer token, and `types` defines the
//! shared wire schema.

pub mod api;
pub mod transport;
pub mod types;
