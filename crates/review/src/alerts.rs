//! Alert management and compliance reporting

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use riskwatch_core::{Alert, AlertCategory, AlertType, RiskFlag};

use crate::error::WorkflowResult;
use crate::store::{AlertStore, SortOrder, TransactionFilter, TransactionStore};

/// Alert list filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFilter {
    pub category: Option<AlertCategory>,
    pub alert_type: Option<AlertType>,
    pub unread_only: bool,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.category.map_or(true, |c| c == alert.category)
            && self.alert_type.map_or(true, |t| t == alert.alert_type)
            && (!self.unread_only || !alert.is_read)
    }
}

/// Analyst-facing alert operations
pub struct AlertCenter {
    alerts: Arc<dyn AlertStore>,
    transactions: Arc<dyn TransactionStore>,
}

impl AlertCenter {
    pub fn new(alerts: Arc<dyn AlertStore>, transactions: Arc<dyn TransactionStore>) -> Self {
        Self { alerts, transactions }
    }

    /// Alerts matching the filter, newest first
    pub async fn list(&self, filter: &AlertFilter) -> WorkflowResult<Vec<Alert>> {
        let alerts = self.alerts.list_alerts().await?;
        Ok(alerts.into_iter().filter(|a| filter.matches(a)).collect())
    }

    pub async fn unread_count(&self) -> WorkflowResult<usize> {
        Ok(self.alerts.list_alerts().await?.iter().filter(|a| !a.is_read).count())
    }

    pub async fn mark_read(&self, id: &str) -> WorkflowResult<Alert> {
        Ok(self.alerts.mark_read(id).await?)
    }

    pub async fn mark_all_read(&self) -> WorkflowResult<usize> {
        Ok(self.alerts.mark_all_read().await?)
    }

    pub async fn delete(&self, id: &str) -> WorkflowResult<()> {
        self.alerts.delete_alert(id).await?;
        info!(alert = id, "alert deleted");
        Ok(())
    }

    /// Create the compliance report alert for the current flagged count
    pub async fn generate_report(&self, generated_at: DateTime<Utc>) -> WorkflowResult<Alert> {
        let all = self
            .transactions
            .list_transactions(&TransactionFilter::new(), SortOrder::NewestFirst, None)
            .await?;
        let flagged = all.iter().filter(|t| t.risk_flag != RiskFlag::None).count();

        let alert = report_alert(flagged, generated_at);
        let alert = self.alerts.create_alert(alert).await?;
        info!(flagged, "compliance report generated");
        Ok(alert)
    }
}

/// Report alert body: warning when anything is flagged, success otherwise
pub fn report_alert(flagged: usize, generated_at: DateTime<Utc>) -> Alert {
    let alert_type = if flagged > 0 {
        AlertType::Warning
    } else {
        AlertType::Success
    };
    let message = format!(
        "Monthly compliance report generated on {}. {} transactions flagged for review.",
        generated_at.format("%b %-d, %Y"),
        flagged
    );
    Alert::new("Compliance Report Generated", message, alert_type, AlertCategory::Compliance)
}
