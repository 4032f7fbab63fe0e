//! Input checks shared by every write path.

use std::sync::LazyLock;

use regex::Regex;

use super::error::EngineError;
use crate::models::ContactDetails;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_PHONE_LEN: usize = 50;
pub const MAX_OUTCOME_LEN: usize = 100;
pub const MAX_PROGRAM_ID_LEN: usize = 100;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Trimmed, non-empty, bounded text.
pub fn required_text(field: &'static str, value: &str, max_len: usize) -> Result<String, EngineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(EngineError::validation(field, format!("must be at most {max_len} characters")));
    }
    Ok(trimmed.to_string())
}

/// Bounded optional text; blank collapses to `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, EngineError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max_len => Err(EngineError::validation(
            field,
            format!("must be at most {max_len} characters"),
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Emails are matched exactly, so only surrounding whitespace is removed.
pub fn email(value: &str) -> Result<String, EngineError> {
    let trimmed = value.trim();
    if trimmed.len() > MAX_EMAIL_LEN {
        return Err(EngineError::validation(
            "email",
            format!("must be at most {MAX_EMAIL_LEN} characters"),
        ));
    }
    if !EMAIL_PATTERN.is_match(trimmed) {
        return Err(EngineError::validation("email", "is not a valid address"));
    }
    Ok(trimmed.to_string())
}

pub fn non_negative(field: &'static str, value: Option<i32>) -> Result<Option<i32>, EngineError> {
    match value {
        Some(v) if v < 0 => Err(EngineError::validation(field, "must not be negative")),
        other => Ok(other),
    }
}

/// Normalized contact facts ready to be written to a Person row.
pub fn contact(details: &ContactDetails) -> Result<ContactDetails, EngineError> {
    Ok(ContactDetails {
        first_name: required_text("first_name", &details.first_name, MAX_NAME_LEN)?,
        last_name: required_text("last_name", &details.last_name, MAX_NAME_LEN)?,
        email: email(&details.email)?,
        phone: optional_text("phone", details.phone.as_deref(), MAX_PHONE_LEN)?,
    })
}
