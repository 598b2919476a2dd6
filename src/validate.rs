//! Field and instance validation
//!
//! Validators are black-box "validate or fail" collaborators referenced from
//! the IR by name. Field validators run inside the builder setter that
//! assigns the field (and again when a value is decoded from the wire);
//! instance validators run once, after all fields are set, before the
//! instance is returned.

use regex::Regex;

use crate::contract::{FieldValue, Serializable};
use crate::error::ValidationError;

/// Validates a single field value
pub trait FieldValidator: Send + Sync {
    fn validate(&self, field_name: &str, value: &FieldValue<'_>) -> Result<(), ValidationError>;
}

/// Validates a fully-assembled instance
pub trait InstanceValidator: Send + Sync {
    fn validate(&self, instance: &dyn Serializable) -> Result<(), ValidationError>;
}

/// Rejects empty or whitespace-only strings (and null)
pub struct NonEmptyString;

impl FieldValidator for NonEmptyString {
    fn validate(&self, field_name: &str, value: &FieldValue<'_>) -> Result<(), ValidationError> {
        match value {
            FieldValue::Str(s) if !s.trim().is_empty() => Ok(()),
            FieldValue::Str(_) | FieldValue::Null => {
                Err(ValidationError::new(field_name, "must not be empty"))
            }
            other => Err(ValidationError::new(
                field_name,
                format!("expected a string, got {}", other.kind_name()),
            )),
        }
    }
}

/// Requires an integer strictly greater than zero
pub struct PositiveI64;

impl FieldValidator for PositiveI64 {
    fn validate(&self, field_name: &str, value: &FieldValue<'_>) -> Result<(), ValidationError> {
        check_int(field_name, value, |v| v > 0, "is not positive")
    }
}

/// Requires an integer strictly less than zero
pub struct NegativeI64;

impl FieldValidator for NegativeI64 {
    fn validate(&self, field_name: &str, value: &FieldValue<'_>) -> Result<(), ValidationError> {
        check_int(field_name, value, |v| v < 0, "is not negative")
    }
}

/// Requires an integer less than or equal to zero
pub struct NonPositiveI64;

impl FieldValidator for NonPositiveI64 {
    fn validate(&self, field_name: &str, value: &FieldValue<'_>) -> Result<(), ValidationError> {
        check_int(field_name, value, |v| v <= 0, "is positive")
    }
}

/// Requires an integer greater than or equal to zero
pub struct NonNegativeI64;

impl FieldValidator for NonNegativeI64 {
    fn validate(&self, field_name: &str, value: &FieldValue<'_>) -> Result<(), ValidationError> {
        check_int(field_name, value, |v| v >= 0, "is negative")
    }
}

fn check_int(
    field_name: &str,
    value: &FieldValue<'_>,
    ok: impl Fn(i64) -> bool,
    message: &str,
) -> Result<(), ValidationError> {
    match value {
        FieldValue::Int(v) if ok(*v) => Ok(()),
        FieldValue::Int(v) => Err(ValidationError::new(
            field_name,
            format!("given value ({v}) {message}"),
        )),
        FieldValue::Null => Ok(()),
        other => Err(ValidationError::new(
            field_name,
            format!("expected an integer, got {}", other.kind_name()),
        )),
    }
}

/// Requires string values to match a regular expression
pub struct MatchesPattern {
    pattern: Regex,
}

impl MatchesPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl FieldValidator for MatchesPattern {
    fn validate(&self, field_name: &str, value: &FieldValue<'_>) -> Result<(), ValidationError> {
        match value {
            FieldValue::Str(s) if self.pattern.is_match(s) => Ok(()),
            FieldValue::Str(s) => Err(ValidationError::new(
                field_name,
                format!("`{s}` does not match pattern `{}`", self.pattern),
            )),
            FieldValue::Null => Ok(()),
            other => Err(ValidationError::new(
                field_name,
                format!("expected a string, got {}", other.kind_name()),
            )),
        }
    }
}
