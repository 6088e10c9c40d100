//! Shared wire DTOs for the client/API boundary.
//!
//! DESIGN
//! ======
//! These types mirror the lab API's JSON payloads (camelCase field names,
//! upper-snake-case roles) so serde round-trips stay lossless between the
//! HTTP layer and the persisted session copy.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// ROLE
// =============================================================================

/// Permission level attached to an identity. Exactly one per user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    LabManager,
    Instructor,
    Student,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::LabManager, Role::Instructor, Role::Student];

    /// Wire name, e.g. `"LAB_MANAGER"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::LabManager => "LAB_MANAGER",
            Self::Instructor => "INSTRUCTOR",
            Self::Student => "STUDENT",
        }
    }

    /// Human-readable label for headings and badges.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::LabManager => "Lab Manager",
            Self::Instructor => "Instructor",
            Self::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ADMIN" => Ok(Self::Admin),
            "LAB_MANAGER" => Ok(Self::LabManager),
            "INSTRUCTOR" => Ok(Self::Instructor),
            "STUDENT" => Ok(Self::Student),
            _ => Err(UnknownRole(raw.to_owned())),
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// The signed-in user's profile as held client-side.
///
/// This is also the persisted `user` record: every field of the auth
/// response except the token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    /// Assigned lab, if the account is attached to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_id: Option<i64>,
}

impl Identity {
    /// `"First Last"`, or the username when both names are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() { self.username.clone() } else { full.to_owned() }
    }
}

// =============================================================================
// AUTH PAYLOADS
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfile {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_id: Option<i64>,
}

impl fmt::Debug for RegisterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterProfile")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("lab_id", &self.lab_id)
            .finish_non_exhaustive()
    }
}

/// Successful login/register payload: the credential plus the identity.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub identity: Identity,
}

/// Pull the payload out of the server's `{ success, message, data }` envelope.
///
/// Bodies without a `data` member are returned as-is so bare payloads
/// work too.
#[must_use]
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

/// `true` when an envelope explicitly reports `success: false`.
#[must_use]
pub fn envelope_reports_failure(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool) == Some(false)
}

/// Human-readable `message` from an error payload, if it carries one.
#[must_use]
pub fn error_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}
