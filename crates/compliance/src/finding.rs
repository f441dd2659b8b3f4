//! Compliance findings produced by a single analysis call

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Identifier of a rule in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    /// Cash or withdrawal at/above the reporting limit
    #[strum(serialize = "RBI_CASH_LIMIT")]
    #[serde(rename = "RBI_CASH_LIMIT")]
    CashLimit,

    /// Offshore / cross-border counterparty or category
    OffshoreTransfer,

    /// Crypto-related counterparty or category
    CryptoTransaction,

    /// Unverified or anonymous counterparty
    UnknownCounterparty,

    /// Amount at/above the high-value threshold
    #[strum(serialize = "HIGH_VALUE_ALERT")]
    #[serde(rename = "HIGH_VALUE_ALERT")]
    HighValue,

    /// Several transactions just below the cash limit
    #[strum(serialize = "STRUCTURING_SUSPECTED")]
    #[serde(rename = "STRUCTURING_SUSPECTED")]
    Structuring,
}

impl RuleId {
    /// Evaluation order of the checks
    pub const ALL: [RuleId; 6] = [
        RuleId::CashLimit,
        RuleId::OffshoreTransfer,
        RuleId::CryptoTransaction,
        RuleId::UnknownCounterparty,
        RuleId::HighValue,
        RuleId::Structuring,
    ];

    /// Severity reported when this rule fires
    pub fn severity(&self) -> Severity {
        match self {
            RuleId::CashLimit | RuleId::UnknownCounterparty | RuleId::Structuring => Severity::High,
            RuleId::OffshoreTransfer | RuleId::CryptoTransaction | RuleId::HighValue => Severity::Medium,
        }
    }

    /// Stable rule code (e.g. `RBI_CASH_LIMIT`)
    pub fn code(&self) -> String {
        self.to_string()
    }
}

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One fired rule. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFinding {
    pub rule: RuleId,
    pub severity: Severity,
    pub message: String,
}

impl ComplianceFinding {
    /// Create a finding with the rule's default severity
    pub fn new(rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: rule.severity(),
            message: message.into(),
        }
    }
}
