use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{0}' is required")]
    Required(String),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Field '{0}' must be a number greater than zero")]
    NotPositive(String),
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).expect("Invalid email regex")
});

pub fn validate_required<'a>(value: Option<&'a str>, field_name: &str) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Required(field_name.to_string())),
    }
}

/// Addresses need a dotted domain; single-label hosts are rejected.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_positive(value: Option<f64>, field_name: &str) -> Result<f64, ValidationError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ValidationError::NotPositive(field_name.to_string())),
    }
}

pub fn validate_uuid(value: &str) -> Result<uuid::Uuid, ValidationError> {
    uuid::Uuid::parse_str(value.trim()).map_err(|_| ValidationError::InvalidUuid(value.to_string()))
}
