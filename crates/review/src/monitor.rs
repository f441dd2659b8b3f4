//! Batch risk monitor
//!
//! Re-evaluates the most recent transactions only when the transaction set
//! (or the rule catalog) has changed since the last successful pass, and
//! persists only verdicts that differ from the stored records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use riskwatch_compliance::{ComplianceEngine, ComplianceError, RuleCatalog};
use riskwatch_core::Transaction;

use crate::error::{WorkflowError, WorkflowResult};
use crate::event::ReviewEvent;
use crate::store::{SortOrder, TransactionFilter, TransactionStore};
use crate::workflow::ReviewWorkflow;

/// Summary of one monitor pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub fingerprint: String,
    /// The set was unchanged and nothing was evaluated
    pub skipped: bool,
    pub evaluated: usize,
    pub updated: usize,
    pub alerts: usize,
    /// Records that lost a compare-and-set race and will be retried next pass
    pub conflicts: usize,
    /// Owners whose records changed
    pub affected_users: BTreeSet<String>,
}

/// Fingerprint of a transaction set under a catalog
///
/// Order-insensitive over `(id, amount, created_date)`. Review fields are
/// excluded so the monitor's own writes do not retrigger it.
pub fn fingerprint(transactions: &[Transaction], catalog: &RuleCatalog) -> WorkflowResult<String> {
    let mut keys: Vec<String> = transactions
        .iter()
        .map(|t| format!("{}|{}|{}", t.id, t.amount.value().normalize(), t.created_date.to_rfc3339()))
        .collect();
    keys.sort();

    let mut hasher = Sha256::new();
    for key in &keys {
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
    }
    let catalog = serde_json::to_vec(catalog).map_err(ComplianceError::from)?;
    hasher.update(catalog);
    Ok(hex::encode(hasher.finalize()))
}

/// Idempotent re-evaluation job
#[derive(Debug, Default)]
pub struct RiskMonitor {
    last_fingerprint: Mutex<Option<String>>,
}

impl RiskMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor that treats `fingerprint` as already applied
    pub fn resume(fingerprint: impl Into<String>) -> Self {
        Self {
            last_fingerprint: Mutex::new(Some(fingerprint.into())),
        }
    }

    /// Fingerprint of the last fully applied pass
    pub async fn last_fingerprint(&self) -> Option<String> {
        self.last_fingerprint.lock().await.clone()
    }

    /// Run one pass over the `limit` most recent transactions
    pub async fn run_once(
        &self,
        transactions: &dyn TransactionStore,
        workflow: &ReviewWorkflow,
        engine: &ComplianceEngine,
        limit: usize,
    ) -> WorkflowResult<MonitorReport> {
        let mut last = self.last_fingerprint.lock().await;

        let batch = transactions
            .list_transactions(&TransactionFilter::new(), SortOrder::NewestFirst, Some(limit))
            .await?;
        let print = fingerprint(&batch, engine.catalog())?;

        if last.as_deref() == Some(print.as_str()) {
            debug!(fingerprint = %print, "transaction set unchanged, skipping");
            return Ok(MonitorReport {
                fingerprint: print,
                skipped: true,
                ..Default::default()
            });
        }

        let verdicts = engine.evaluate_batch(&batch);
        let mut report = MonitorReport {
            fingerprint: print.clone(),
            evaluated: verdicts.len(),
            ..Default::default()
        };

        for (tx, verdict) in batch.iter().zip(&verdicts) {
            match workflow.apply_verdict(verdict).await {
                Ok(outcome) if outcome.changed => {
                    report.updated += 1;
                    report.alerts += usize::from(outcome.alert.is_some());
                    report.affected_users.insert(tx.created_by.clone());
                }
                Ok(_) => {}
                Err(WorkflowError::ConcurrencyConflict { id }) => {
                    warn!(transaction = %id, "verdict lost a concurrent update, will retry");
                    report.conflicts += 1;
                }
                Err(err) => return Err(err),
            }
        }

        if report.conflicts == 0 {
            *last = Some(print.clone());
        }

        workflow.record_event(ReviewEvent::monitor_run(print, report.evaluated, report.updated, report.alerts))?;
        info!(
            evaluated = report.evaluated,
            updated = report.updated,
            alerts = report.alerts,
            conflicts = report.conflicts,
            "monitor pass complete"
        );
        Ok(report)
    }
}
