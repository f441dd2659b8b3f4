//! Review workflow errors

use riskwatch_compliance::ComplianceError;
use riskwatch_core::ValidationError;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Errors from the review workflow and service facade
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed input, rejected before anything is scored or written
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A compare-and-set write lost a race; re-fetch and retry
    #[error("Concurrent update on {id}, re-fetch and retry")]
    ConcurrencyConflict { id: String },

    /// A collaborator read or write failed
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} a {from} record")]
    InvalidTransition { from: String, action: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] ComplianceError),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => WorkflowError::NotFound(what),
            StoreError::Conflict(id) => WorkflowError::ConcurrencyConflict { id },
            StoreError::Unavailable(msg) => WorkflowError::DataUnavailable(msg),
            StoreError::Duplicate(id) => WorkflowError::Validation(ValidationError::DuplicateId(id)),
        }
    }
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
