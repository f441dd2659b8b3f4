//! Transaction record
//!
//! A transaction is immutable once created, except for the review fields
//! (`status`, `risk_flag`, `anomaly_score`, `notes`) which only the engine or an
//! explicit analyst action may change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::amount::Amount;
use crate::error::{parse_variant, ValidationError};
use crate::risk::RiskFlag;

/// Kind of financial event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Investment,
    Redemption,
}

impl TransactionType {
    /// Parse from text, rejecting unknown values
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        parse_variant("type", value)
    }
}

/// Workflow state of a transaction record
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Flagged,
}

impl TransactionStatus {
    /// Completed and failed are terminal for the review workflow
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }

    /// Parse from text, rejecting unknown values
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        parse_variant("status", value)
    }
}

/// The pair of fields a review transition reads and writes.
///
/// Writers compare this snapshot against the stored record before applying
/// an update, so two racing transitions cannot silently overwrite each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pub status: TransactionStatus,
    pub risk_flag: RiskFlag,
}

/// A financial transaction owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque storage identifier
    pub id: String,

    /// Human-readable reference (e.g. "TXN1718000000001")
    #[serde(default)]
    pub transaction_id: String,

    /// Non-negative, currency-denominated amount
    pub amount: Amount,

    /// Event kind
    #[serde(rename = "type")]
    pub tx_type: TransactionType,

    /// Free-text category (e.g. "Salary", "Cash")
    #[serde(default)]
    pub category: String,

    /// Free-text counterparty
    #[serde(default)]
    pub counterparty: Option<String>,

    #[serde(default)]
    pub status: TransactionStatus,

    #[serde(default)]
    pub risk_flag: RiskFlag,

    /// z-score magnitude or ceiling saturation value, always >= 0
    #[serde(default)]
    pub anomaly_score: f64,

    #[serde(default)]
    pub notes: Option<String>,

    /// Owning user
    pub created_by: String,

    pub created_date: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending transaction with a generated storage id
    pub fn new(
        transaction_id: impl Into<String>,
        amount: Amount,
        tx_type: TransactionType,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            amount,
            tx_type,
            category: String::new(),
            counterparty: None,
            status: TransactionStatus::Pending,
            risk_flag: RiskFlag::None,
            anomaly_score: 0.0,
            notes: None,
            created_by: created_by.into(),
            created_date: Utc::now(),
        }
    }

    /// Set the storage id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the counterparty
    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    /// Set the creation timestamp
    pub fn created_at(mut self, created_date: DateTime<Utc>) -> Self {
        self.created_date = created_date;
        self
    }

    /// Set the workflow status
    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the stored risk flag
    pub fn with_risk_flag(mut self, risk_flag: RiskFlag) -> Self {
        self.risk_flag = risk_flag;
        self
    }

    /// Reference shown to analysts: the human-readable id, else the storage id
    pub fn reference(&self) -> &str {
        if self.transaction_id.is_empty() {
            &self.id
        } else {
            &self.transaction_id
        }
    }

    /// Current review state snapshot
    pub fn review_state(&self) -> ReviewState {
        ReviewState {
            status: self.status,
            risk_flag: self.risk_flag,
        }
    }

    /// Check record-level invariants not expressible in the type
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.created_by.trim().is_empty() {
            return Err(ValidationError::EmptyField("created_by"));
        }
        if !self.anomaly_score.is_finite() || self.anomaly_score < 0.0 {
            return Err(ValidationError::Malformed(format!(
                "anomaly_score must be a non-negative number, got {}",
                self.anomaly_score
            )));
        }
        Ok(())
    }

    /// Parse and validate a single transaction from JSON
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let tx: Transaction = serde_json::from_str(json)?;
        tx.validate()?;
        Ok(tx)
    }

    /// Parse and validate a JSON array of transactions
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ValidationError> {
        let txs: Vec<Transaction> = serde_json::from_str(json)?;
        for tx in &txs {
            tx.validate()?;
        }
        Ok(txs)
    }
}
