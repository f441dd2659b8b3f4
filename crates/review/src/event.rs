//! Review events (written to the review ledger)
//!
//! The audit trail of every state change the workflow makes. Events are
//! append-only and immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use riskwatch_core::{KycStatus, ReviewState, RiskFlag};

use crate::workflow::{KycAction, ReviewAction};

/// Events appended to the review ledger (append-only JSONL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ReviewEvent {
    /// Engine verdict changed a transaction's review state
    AutoFlagged {
        id: String,
        transaction_id: String,
        user_id: String,
        from: ReviewState,
        to: ReviewState,
        anomaly_score: f64,
        rules: Vec<String>,
        alerted: bool,
        timestamp: DateTime<Utc>,
    },

    /// Analyst approve/decline/flag
    ReviewCompleted {
        id: String,
        transaction_id: String,
        user_id: String,
        action: ReviewAction,
        from: ReviewState,
        to: ReviewState,
        timestamp: DateTime<Utc>,
    },

    /// Analyst KYC decision
    KycUpdated {
        id: String,
        user_id: String,
        action: KycAction,
        from: KycStatus,
        to: KycStatus,
        timestamp: DateTime<Utc>,
    },

    /// Batch monitor pass that evaluated a changed transaction set
    MonitorRun {
        id: String,
        fingerprint: String,
        evaluated: usize,
        updated: usize,
        alerts: usize,
        timestamp: DateTime<Utc>,
    },
}

impl ReviewEvent {
    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Create an AutoFlagged event
    pub fn auto_flagged(
        transaction_id: impl Into<String>,
        user_id: impl Into<String>,
        from: ReviewState,
        to: ReviewState,
        anomaly_score: f64,
        rules: Vec<String>,
        alerted: bool,
    ) -> Self {
        ReviewEvent::AutoFlagged {
            id: Self::new_id(),
            transaction_id: transaction_id.into(),
            user_id: user_id.into(),
            from,
            to,
            anomaly_score,
            rules,
            alerted,
            timestamp: Utc::now(),
        }
    }

    /// Create a ReviewCompleted event
    pub fn review_completed(
        transaction_id: impl Into<String>,
        user_id: impl Into<String>,
        action: ReviewAction,
        from: ReviewState,
        to: ReviewState,
    ) -> Self {
        ReviewEvent::ReviewCompleted {
            id: Self::new_id(),
            transaction_id: transaction_id.into(),
            user_id: user_id.into(),
            action,
            from,
            to,
            timestamp: Utc::now(),
        }
    }

    /// Create a KycUpdated event
    pub fn kyc_updated(user_id: impl Into<String>, action: KycAction, from: KycStatus, to: KycStatus) -> Self {
        ReviewEvent::KycUpdated {
            id: Self::new_id(),
            user_id: user_id.into(),
            action,
            from,
            to,
            timestamp: Utc::now(),
        }
    }

    /// Create a MonitorRun event
    pub fn monitor_run(fingerprint: impl Into<String>, evaluated: usize, updated: usize, alerts: usize) -> Self {
        ReviewEvent::MonitorRun {
            id: Self::new_id(),
            fingerprint: fingerprint.into(),
            evaluated,
            updated,
            alerts,
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> &str {
        match self {
            ReviewEvent::AutoFlagged { id, .. } => id,
            ReviewEvent::ReviewCompleted { id, .. } => id,
            ReviewEvent::KycUpdated { id, .. } => id,
            ReviewEvent::MonitorRun { id, .. } => id,
        }
    }

    /// Get the timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ReviewEvent::AutoFlagged { timestamp, .. } => *timestamp,
            ReviewEvent::ReviewCompleted { timestamp, .. } => *timestamp,
            ReviewEvent::KycUpdated { timestamp, .. } => *timestamp,
            ReviewEvent::MonitorRun { timestamp, .. } => *timestamp,
        }
    }

    /// Get the user ID if applicable
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ReviewEvent::AutoFlagged { user_id, .. } => Some(user_id),
            ReviewEvent::ReviewCompleted { user_id, .. } => Some(user_id),
            ReviewEvent::KycUpdated { user_id, .. } => Some(user_id),
            ReviewEvent::MonitorRun { .. } => None,
        }
    }

    /// Flag recorded after the change, for transaction events
    pub fn resulting_flag(&self) -> Option<RiskFlag> {
        match self {
            ReviewEvent::AutoFlagged { to, .. } | ReviewEvent::ReviewCompleted { to, .. } => Some(to.risk_flag),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskwatch_core::TransactionStatus;

    fn state(status: TransactionStatus, risk_flag: RiskFlag) -> ReviewState {
        ReviewState { status, risk_flag }
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ReviewEvent::review_completed(
            "t1",
            "user-1",
            ReviewAction::Approve,
            state(TransactionStatus::Flagged, RiskFlag::High),
            state(TransactionStatus::Completed, RiskFlag::None),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"review_completed\""));
        assert!(json.contains("\"action\":\"approve\""));

        let parsed: ReviewEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_accessors() {
        let event = ReviewEvent::kyc_updated("user-1", KycAction::Verify, KycStatus::InProgress, KycStatus::Verified);
        assert_eq!(event.user_id(), Some("user-1"));
        assert!(event.resulting_flag().is_none());

        let run = ReviewEvent::monitor_run("abc", 10, 2, 1);
        assert!(run.user_id().is_none());
        assert!(!run.id().is_empty());
    }

    #[test]
    fn test_resulting_flag() {
        let event = ReviewEvent::auto_flagged(
            "t1",
            "user-1",
            state(TransactionStatus::Pending, RiskFlag::None),
            state(TransactionStatus::Flagged, RiskFlag::Medium),
            1.7,
            vec!["OFFSHORE_TRANSFER".to_string()],
            true,
        );
        assert_eq!(event.resulting_flag(), Some(RiskFlag::Medium));
    }
}
