//! Structural checks on registration and login payloads.
//!
//! The validators take the raw JSON body so that a missing field and a field
//! of the wrong type are reported the same way. Violations accumulate in
//! field order instead of stopping at the first one.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{AuthError, AuthResult};
use crate::models::{Credentials, NewUser};

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const NAME_MAX_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Converts a failed result into [`AuthError::Validation`].
    pub fn into_result(self) -> AuthResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(AuthError::Validation(self.errors))
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"))
}

/// Non-empty string field, or `None` when absent, empty, or not a string.
fn string_field<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

pub fn validate_registration(payload: &Value) -> ValidationResult {
    let mut errors = Vec::new();

    match string_field(payload, "email") {
        None => errors.push("Email is required".to_string()),
        Some(email) if !email_pattern().is_match(email) => {
            errors.push("Invalid email format".to_string())
        }
        Some(_) => {}
    }

    match string_field(payload, "password").map(|p| p.chars().count()) {
        None => errors.push("Password is required".to_string()),
        Some(len) if len < PASSWORD_MIN_LEN => errors.push(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        )),
        Some(len) if len > PASSWORD_MAX_LEN => errors.push("Password too long".to_string()),
        Some(_) => {}
    }

    match string_field(payload, "name") {
        None => errors.push("Name is required".to_string()),
        Some(name) if name.trim().is_empty() => errors.push("Name cannot be empty".to_string()),
        Some(name) if name.chars().count() > NAME_MAX_LEN => {
            errors.push(format!("Name cannot exceed {NAME_MAX_LEN} characters"))
        }
        Some(_) => {}
    }

    ValidationResult::from_errors(errors)
}

/// Login only checks presence and type; the email shape is not re-validated.
pub fn validate_login(payload: &Value) -> ValidationResult {
    let mut errors = Vec::new();

    if string_field(payload, "email").is_none() {
        errors.push("Valid email is required".to_string());
    }
    if string_field(payload, "password").is_none() {
        errors.push("Password is required".to_string());
    }

    ValidationResult::from_errors(errors)
}

/// Validates a registration body and extracts its fields.
pub fn parse_registration(payload: &Value) -> AuthResult<NewUser> {
    validate_registration(payload).into_result()?;
    serde_json::from_value(payload.clone())
        .map_err(|err| AuthError::Validation(vec![err.to_string()]))
}

/// Validates a login body and extracts its fields.
pub fn parse_login(payload: &Value) -> AuthResult<Credentials> {
    validate_login(payload).into_result()?;
    serde_json::from_value(payload.clone())
        .map_err(|err| AuthError::Validation(vec![err.to_string()]))
}
