//! RiskWatch Core - Domain types
//!
//! This crate contains the records shared by the risk engine and the review
//! workflow:
//! - `Amount`: Non-negative decimal wrapper for transaction amounts
//! - `Transaction`: Financial event plus its engine-owned review fields
//! - `UserProfile`: Per-user KYC status and risk score
//! - `Alert`: Persisted notification emitted by the workflow
//!
//! Malformed input (negative amounts, unknown enum values) is rejected here,
//! at construction time, so downstream scoring only sees valid records.

pub mod alert;
pub mod amount;
pub mod error;
pub mod profile;
pub mod risk;
pub mod transaction;

pub use alert::{Alert, AlertCategory, AlertType};
pub use amount::Amount;
pub use error::ValidationError;
pub use profile::{KycStatus, RiskTolerance, UserProfile};
pub use risk::{RiskFlag, RiskLevel};
pub use transaction::{ReviewState, Transaction, TransactionStatus, TransactionType};
