//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules keep storage and navigation concerns out of the session
//! store so each piece can be tested with in-memory fakes.

pub mod auth;
pub mod persistence;
pub mod validation;
