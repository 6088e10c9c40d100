//! Client state: the session store and what its role permits.

pub mod auth;
pub mod permissions;
