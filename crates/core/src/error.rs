//! Validation errors for malformed input

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Input rejected before any scoring takes place
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Unknown {field} value: {value}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("Field {0} cannot be empty")]
    EmptyField(&'static str),

    #[error("Malformed record: {0}")]
    Malformed(String),

    /// Transactions are immutable once created; an id can only be inserted once
    #[error("Duplicate transaction id: {0}")]
    DuplicateId(String),
}

impl ValidationError {
    /// Create an unknown-variant error
    pub fn unknown(field: &'static str, value: impl Into<String>) -> Self {
        ValidationError::UnknownVariant {
            field,
            value: value.into(),
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::Malformed(err.to_string())
    }
}

/// Parse a strum-backed enum, mapping failures to [`ValidationError::UnknownVariant`]
pub(crate) fn parse_variant<T: FromStr>(field: &'static str, value: &str) -> Result<T, ValidationError> {
    value
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| ValidationError::unknown(field, value))
}
