//! Review workflow - transaction state machine and KYC sub-workflow
//!
//! ```text
//! pending ──► flagged ──► completed
//!    │           │
//!    ├───────────┴──────► failed
//!    └──────────────────► completed
//! ```
//!
//! Writes on one transaction are serialized by a per-id async lock, and every
//! store update carries the review state it was computed from so a racing
//! writer outside this process surfaces as a conflict instead of a lost
//! update.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use riskwatch_compliance::analyzer::format_inr;
use riskwatch_compliance::RiskVerdict;
use riskwatch_core::{
    Alert, AlertCategory, AlertType, KycStatus, ReviewState, RiskFlag, Transaction,
    TransactionStatus, UserProfile, ValidationError,
};

use crate::error::{WorkflowError, WorkflowResult};
use crate::event::ReviewEvent;
use crate::ledger::ReviewLedger;
use crate::store::{AlertStore, ProfilePatch, ProfileStore, TransactionPatch, TransactionStore};

/// Analyst action on a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Any status → completed, flag cleared
    Approve,
    /// pending/flagged → failed, flag kept for audit
    Decline,
    /// pending/flagged → flagged with at least this severity
    Flag(RiskFlag),
}

impl ReviewAction {
    /// Parse an action name, with the severity required by `flag`
    pub fn parse(action: &str, severity: Option<&str>) -> Result<Self, ValidationError> {
        match action.trim().to_lowercase().as_str() {
            "approve" => Ok(ReviewAction::Approve),
            "decline" => Ok(ReviewAction::Decline),
            "flag" => {
                let severity = severity.ok_or(ValidationError::EmptyField("severity"))?;
                Ok(ReviewAction::Flag(RiskFlag::parse(severity)?))
            }
            other => Err(ValidationError::unknown("action", other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Decline => "decline",
            ReviewAction::Flag(_) => "flag",
        }
    }
}

/// Analyst action on a profile's KYC status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KycAction {
    /// pending → in_progress
    Start,
    /// pending/in_progress → verified
    Verify,
    /// pending/in_progress → rejected
    Reject,
}

impl KycAction {
    pub fn target(&self) -> KycStatus {
        match self {
            KycAction::Start => KycStatus::InProgress,
            KycAction::Verify => KycStatus::Verified,
            KycAction::Reject => KycStatus::Rejected,
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        value
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| ValidationError::unknown("kyc_action", value))
    }
}

/// Workflow configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Most recent transactions evaluated per monitor pass
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Whether a raised engine flag moves a pending record to flagged
    #[serde(default = "default_auto_flag_pending")]
    pub auto_flag_pending: bool,
}

fn default_batch_limit() -> usize {
    100
}

fn default_auto_flag_pending() -> bool {
    true
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            auto_flag_pending: default_auto_flag_pending(),
        }
    }
}

/// Result of applying an engine verdict to a stored transaction
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictOutcome {
    pub transaction: Transaction,
    /// Whether anything was written
    pub changed: bool,
    pub alert: Option<Alert>,
}

/// Next state for an analyst action, or `None` when it changes nothing
pub fn review_transition(from: ReviewState, action: ReviewAction) -> WorkflowResult<Option<ReviewState>> {
    let invalid = || WorkflowError::InvalidTransition {
        from: from.status.to_string(),
        action: action.name().to_string(),
    };

    let to = match action {
        ReviewAction::Approve => ReviewState {
            status: TransactionStatus::Completed,
            risk_flag: RiskFlag::None,
        },
        ReviewAction::Decline => match from.status {
            TransactionStatus::Pending | TransactionStatus::Flagged => ReviewState {
                status: TransactionStatus::Failed,
                risk_flag: from.risk_flag,
            },
            TransactionStatus::Failed => return Ok(None),
            TransactionStatus::Completed => return Err(invalid()),
        },
        ReviewAction::Flag(severity) => {
            if !severity.is_raised() {
                return Err(ValidationError::Malformed("flag action needs a severity above none".to_string()).into());
            }
            if from.status.is_terminal() {
                return Err(invalid());
            }
            ReviewState {
                status: TransactionStatus::Flagged,
                risk_flag: from.risk_flag.max(severity),
            }
        }
    };

    Ok((to != from).then_some(to))
}

/// Next state for an engine verdict flag.
///
/// Terminal records are untouched, pending records take the verdict flag,
/// flagged records are only ever escalated.
pub fn auto_transition(from: ReviewState, flag: RiskFlag, auto_flag_pending: bool) -> ReviewState {
    match from.status {
        TransactionStatus::Completed | TransactionStatus::Failed => from,
        TransactionStatus::Pending => ReviewState {
            status: if auto_flag_pending && flag.is_raised() {
                TransactionStatus::Flagged
            } else {
                TransactionStatus::Pending
            },
            risk_flag: flag,
        },
        TransactionStatus::Flagged => ReviewState {
            status: TransactionStatus::Flagged,
            risk_flag: from.risk_flag.max(flag),
        },
    }
}

/// Alert on the first crossing into flagged, or on a severity increase,
/// once the flag is medium or high
pub fn should_alert(from: ReviewState, to: ReviewState) -> bool {
    let crossed = from.status != TransactionStatus::Flagged && to.status == TransactionStatus::Flagged;
    let escalated = to.risk_flag > from.risk_flag;
    to.risk_flag.is_alerting() && (crossed || escalated)
}

/// Next KYC status, or `None` when the action is already in effect
pub fn kyc_transition(from: KycStatus, action: KycAction) -> WorkflowResult<Option<KycStatus>> {
    let to = action.target();
    if from == to {
        return Ok(None);
    }
    let allowed = match action {
        KycAction::Start => from == KycStatus::Pending,
        KycAction::Verify | KycAction::Reject => !from.is_decided(),
    };
    if !allowed {
        return Err(WorkflowError::InvalidTransition {
            from: from.to_string(),
            action: action.to_string(),
        });
    }
    Ok(Some(to))
}

type KeyLocks = DashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Held per-key write lock. The map entry goes away with its last holder.
struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Transaction review state machine
pub struct ReviewWorkflow {
    transactions: Arc<dyn TransactionStore>,
    profiles: Arc<dyn ProfileStore>,
    alerts: Arc<dyn AlertStore>,
    ledger: Mutex<ReviewLedger>,
    locks: KeyLocks,
    config: ReviewConfig,
}

impl ReviewWorkflow {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        profiles: Arc<dyn ProfileStore>,
        alerts: Arc<dyn AlertStore>,
        ledger: ReviewLedger,
        config: ReviewConfig,
    ) -> Self {
        Self {
            transactions,
            profiles,
            alerts,
            ledger: Mutex::new(ledger),
            locks: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    async fn lock_key(&self, key: String) -> KeyGuard<'_> {
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        KeyGuard {
            locks: &self.locks,
            key,
            guard: Some(guard),
        }
    }

    pub fn record_event(&self, event: ReviewEvent) -> WorkflowResult<()> {
        let mut ledger = match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ledger.append(&event)?;
        Ok(())
    }

    /// Snapshot of the audit trail
    pub fn ledger_events(&self) -> WorkflowResult<Vec<ReviewEvent>> {
        let ledger = match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(ledger.read_all()?)
    }

    /// Apply an analyst action and return the updated record
    pub async fn apply_review_action(&self, id: &str, action: ReviewAction) -> WorkflowResult<Transaction> {
        let _guard = self.lock_key(id.to_string()).await;

        let current = self.transactions.get_transaction(id).await?;
        let from = current.review_state();
        let Some(to) = review_transition(from, action)? else {
            debug!(transaction = current.reference(), action = action.name(), "review action is a no-op");
            return Ok(current);
        };

        let patch = TransactionPatch {
            status: Some(to.status),
            risk_flag: Some(to.risk_flag),
            ..Default::default()
        };
        let updated = self.transactions.update_transaction(id, Some(from), patch).await?;

        self.record_event(ReviewEvent::review_completed(
            updated.reference(),
            updated.created_by.clone(),
            action,
            from,
            to,
        ))?;
        info!(
            transaction = updated.reference(),
            action = action.name(),
            status = %to.status,
            risk_flag = %to.risk_flag,
            "review action applied"
        );

        Ok(updated)
    }

    /// Persist an engine verdict, writing only what differs
    pub async fn apply_verdict(&self, verdict: &RiskVerdict) -> WorkflowResult<VerdictOutcome> {
        let _guard = self.lock_key(verdict.id.clone()).await;

        let current = self.transactions.get_transaction(&verdict.id).await?;
        let from = current.review_state();
        let to = auto_transition(from, verdict.risk_flag, self.config.auto_flag_pending);
        let score_changed = current.anomaly_score != verdict.anomaly_score;

        if to == from && !score_changed {
            return Ok(VerdictOutcome {
                transaction: current,
                changed: false,
                alert: None,
            });
        }

        let patch = TransactionPatch {
            status: (to.status != from.status).then_some(to.status),
            risk_flag: (to.risk_flag != from.risk_flag).then_some(to.risk_flag),
            anomaly_score: score_changed.then_some(verdict.anomaly_score),
            notes: None,
        };

        // Alert before the flag write; a failed alert leaves the record untouched
        let alert = if should_alert(from, to) {
            let mut flagged = current.clone();
            patch.apply(&mut flagged);
            Some(self.alerts.create_alert(flag_alert(&flagged, verdict)).await?)
        } else {
            None
        };

        let updated = match self.transactions.update_transaction(&verdict.id, Some(from), patch).await {
            Ok(updated) => updated,
            Err(err) => {
                if let Some(alert) = &alert {
                    if let Err(cleanup) = self.alerts.delete_alert(&alert.id).await {
                        warn!(alert = %alert.id, error = %cleanup, "could not withdraw alert for unwritten flag");
                    }
                }
                return Err(err.into());
            }
        };

        if to != from {
            let rules = verdict.analysis.findings.iter().map(|f| f.rule.code()).collect();
            self.record_event(ReviewEvent::auto_flagged(
                updated.reference(),
                updated.created_by.clone(),
                from,
                to,
                verdict.anomaly_score,
                rules,
                alert.is_some(),
            ))?;
            info!(
                transaction = updated.reference(),
                status = %to.status,
                risk_flag = %to.risk_flag,
                alerted = alert.is_some(),
                "engine verdict applied"
            );
        }

        Ok(VerdictOutcome {
            transaction: updated,
            changed: true,
            alert,
        })
    }

    /// Apply an analyst KYC decision and return the updated profile
    pub async fn update_kyc(&self, user_id: &str, action: KycAction) -> WorkflowResult<UserProfile> {
        let _guard = self.lock_key(format!("kyc:{user_id}")).await;

        let current = self.profiles.get_profile(user_id).await?;
        let from = current.kyc_status;
        let Some(to) = kyc_transition(from, action)? else {
            return Ok(current);
        };

        let patch = ProfilePatch {
            kyc_status: Some(to),
            ..Default::default()
        };
        let updated = self.profiles.update_profile(user_id, Some(from), patch).await?;

        if let Some(alert) = kyc_alert(&updated, action) {
            self.alerts.create_alert(alert).await?;
        }
        self.record_event(ReviewEvent::kyc_updated(user_id, action, from, to))?;
        info!(user = user_id, from = %from, to = %to, "kyc status updated");

        Ok(updated)
    }
}

fn flag_alert(tx: &Transaction, verdict: &RiskVerdict) -> Alert {
    let (title, alert_type) = if tx.risk_flag == RiskFlag::High {
        ("High-Risk Transaction Flagged", AlertType::Danger)
    } else {
        ("Transaction Flagged for Review", AlertType::Warning)
    };
    let category = if verdict.has_findings() {
        AlertCategory::Compliance
    } else {
        AlertCategory::Fraud
    };

    let kind = tx.tx_type.to_string();
    let article = if kind.starts_with(['a', 'e', 'i', 'o', 'u']) { "An" } else { "A" };
    let mut message = format!(
        "{article} {kind} of ₹{} ({}) was flagged as {} risk for review.",
        format_inr(tx.amount.value()),
        tx.reference(),
        tx.risk_flag
    );
    for finding in &verdict.analysis.findings {
        message.push(' ');
        message.push_str(&finding.message);
        message.push('.');
    }

    Alert::new(title, message, alert_type, category).for_transaction(tx.id.clone())
}

fn kyc_alert(profile: &UserProfile, action: KycAction) -> Option<Alert> {
    let who = profile.full_name.as_deref().unwrap_or(&profile.user_id);
    match action {
        KycAction::Start => None,
        KycAction::Verify => Some(Alert::new(
            "KYC Verification Complete",
            format!("KYC documents for {who} have been verified successfully."),
            AlertType::Success,
            AlertCategory::Compliance,
        )),
        KycAction::Reject => Some(Alert::new(
            "KYC Verification Rejected",
            format!("KYC verification for {who} was rejected. Resubmission is required."),
            AlertType::Danger,
            AlertCategory::Compliance,
        )),
    }
}
