//! Compliance errors

use riskwatch_core::ValidationError;
use thiserror::Error;

/// Errors from the compliance engine
///
/// Analysis itself is total over well-formed records; these errors come from
/// input validation and catalog loading.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type for compliance operations
pub type ComplianceResult<T> = Result<T, ComplianceError>;
