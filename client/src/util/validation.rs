//! Form checks run before any auth request leaves the client.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::fmt;

use crate::net::types::RegisterProfile;

pub const MIN_PASSWORD_CHARS: usize = 6;
const STRONG_PASSWORD_CHARS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    /// Length-based rating: under 6 chars weak, under 10 medium.
    #[must_use]
    pub fn of(password: &str) -> Self {
        match password.chars().count() {
            n if n < MIN_PASSWORD_CHARS => Self::Weak,
            n if n < STRONG_PASSWORD_CHARS => Self::Medium,
            _ => Self::Strong,
        }
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        })
    }
}

/// # Errors
///
/// Returns the user-facing message for the first missing field.
pub fn validate_login(username: &str, password: &str) -> Result<(), String> {
    if username.trim().is_empty() || password.is_empty() {
        return Err("Username and password are required".to_owned());
    }
    Ok(())
}

/// # Errors
///
/// Returns the user-facing message for the first failing check.
pub fn validate_registration(profile: &RegisterProfile) -> Result<(), String> {
    let required = [
        ("First name", &profile.first_name),
        ("Last name", &profile.last_name),
        ("Username", &profile.username),
        ("Email", &profile.email),
    ];
    if let Some((label, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(format!("{label} is required"));
    }
    if !looks_like_email(profile.email.trim()) {
        return Err("Please enter a valid email address".to_owned());
    }
    if profile.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(format!("Password must be at least {MIN_PASSWORD_CHARS} characters"));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
