//! Compliance service facade - wires the engine, stores and workflow together

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use riskwatch_compliance::{
    recent_history, CatalogHandle, ComplianceEngine, RiskAnalysisResult, RuleCatalog, RuleMatchers,
    UserRiskSummary,
};
use riskwatch_core::{Alert, KycStatus, RiskFlag, RiskLevel, Transaction, UserProfile};

use crate::alerts::AlertCenter;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::ReviewLedger;
use crate::monitor::{MonitorReport, RiskMonitor};
use crate::store::{
    AlertStore, InMemoryStore, ProfilePatch, ProfileStore, SortOrder, TransactionFilter, TransactionStore,
};
use crate::workflow::{KycAction, ReviewAction, ReviewConfig, ReviewWorkflow};

/// Dashboard totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceOverview {
    pub total_transactions: usize,
    /// Records with any raised flag
    pub flagged_transactions: usize,
    pub unread_alerts: usize,
    /// Profiles whose KYC is not verified
    pub pending_kyc: usize,
    pub high_risk_users: usize,
}

/// In-process entry point for every compliance operation
pub struct ComplianceService {
    catalog: Arc<CatalogHandle>,
    matchers: Option<RuleMatchers>,
    engine: RwLock<Arc<ComplianceEngine>>,
    transactions: Arc<dyn TransactionStore>,
    profiles: Arc<dyn ProfileStore>,
    workflow: ReviewWorkflow,
    alerts: AlertCenter,
    monitor: RiskMonitor,
}

impl ComplianceService {
    /// Service over one store implementing every contract
    pub fn new<S>(store: Arc<S>, ledger: ReviewLedger, config: ReviewConfig, catalog: RuleCatalog) -> WorkflowResult<Self>
    where
        S: TransactionStore + ProfileStore + AlertStore + 'static,
    {
        Self::from_stores(store.clone(), store.clone(), store, ledger, config, catalog)
    }

    /// Service over separate collaborators
    pub fn from_stores(
        transactions: Arc<dyn TransactionStore>,
        profiles: Arc<dyn ProfileStore>,
        alerts: Arc<dyn AlertStore>,
        ledger: ReviewLedger,
        config: ReviewConfig,
        catalog: RuleCatalog,
    ) -> WorkflowResult<Self> {
        catalog.validate()?;
        Ok(Self::assemble(transactions, profiles, alerts, ledger, config, catalog))
    }

    /// Empty in-memory service with default settings
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::assemble(
            store.clone(),
            store.clone(),
            store,
            ReviewLedger::in_memory(),
            ReviewConfig::default(),
            RuleCatalog::default(),
        )
    }

    fn assemble(
        transactions: Arc<dyn TransactionStore>,
        profiles: Arc<dyn ProfileStore>,
        alerts: Arc<dyn AlertStore>,
        ledger: ReviewLedger,
        config: ReviewConfig,
        catalog: RuleCatalog,
    ) -> Self {
        let catalog = Arc::new(CatalogHandle::new(catalog));
        let engine = ComplianceEngine::new(catalog.current());
        let workflow = ReviewWorkflow::new(transactions.clone(), profiles.clone(), alerts.clone(), ledger, config);

        Self {
            catalog,
            matchers: None,
            engine: RwLock::new(Arc::new(engine)),
            alerts: AlertCenter::new(alerts, transactions.clone()),
            transactions,
            profiles,
            workflow,
            monitor: RiskMonitor::new(),
        }
    }

    /// Continue from a previously applied monitor fingerprint
    pub fn with_monitor(mut self, monitor: RiskMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Replace the counterparty classifiers (kept across catalog reloads)
    pub fn with_matchers(mut self, matchers: RuleMatchers) -> Self {
        self.matchers = Some(matchers);
        self.rebuild_engine();
        self
    }

    fn rebuild_engine(&self) {
        let mut engine = ComplianceEngine::new(self.catalog.current());
        if let Some(matchers) = &self.matchers {
            engine = engine.with_matchers(matchers.clone());
        }
        let next = Arc::new(engine);
        match self.engine.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Engine snapshot for the current catalog
    pub fn engine(&self) -> Arc<ComplianceEngine> {
        match self.engine.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn catalog(&self) -> Arc<RuleCatalog> {
        self.catalog.current()
    }

    /// Swap in a new catalog; in-flight evaluations keep their snapshot
    pub fn replace_catalog(&self, catalog: RuleCatalog) -> WorkflowResult<()> {
        self.catalog.replace(catalog)?;
        self.rebuild_engine();
        Ok(())
    }

    /// Hot reload from a JSON file
    pub fn reload_catalog(&self, path: &Path) -> WorkflowResult<()> {
        self.catalog.reload_from(path)?;
        self.rebuild_engine();
        info!(path = %path.display(), "catalog reloaded");
        Ok(())
    }

    pub fn workflow(&self) -> &ReviewWorkflow {
        &self.workflow
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    pub fn monitor(&self) -> &RiskMonitor {
        &self.monitor
    }

    /// Rule evaluation of one transaction against caller-supplied history
    pub fn analyze_transaction(&self, tx: &Transaction, history: &[&Transaction]) -> WorkflowResult<RiskAnalysisResult> {
        tx.validate()?;
        Ok(self.engine().analyze_transaction(tx, history))
    }

    /// Rule evaluation of a stored transaction against its owner's recent history
    pub async fn analyze_stored(&self, id: &str) -> WorkflowResult<RiskAnalysisResult> {
        let tx = self.transactions.get_transaction(id).await?;
        let owned = self.owned_transactions(&tx.created_by).await?;
        let engine = self.engine();
        let history = recent_history(&owned, &tx, &engine.catalog().history);
        Ok(engine.analyze_transaction(&tx, &history))
    }

    /// Batch copy annotated with detector flags and scores
    pub fn detect_anomalies(&self, batch: &[Transaction]) -> WorkflowResult<Vec<Transaction>> {
        for tx in batch {
            tx.validate()?;
        }
        Ok(self.engine().detect_anomalies(batch))
    }

    pub fn summarize_user_risk(&self, transactions: &[Transaction], profile: &UserProfile) -> UserRiskSummary {
        self.engine().summarize_user_risk(transactions, profile)
    }

    /// Summary for a stored user
    pub async fn user_risk(&self, user_id: &str) -> WorkflowResult<UserRiskSummary> {
        let profile = self.profiles.get_profile(user_id).await?;
        let owned = self.owned_transactions(user_id).await?;
        Ok(self.summarize_user_risk(&owned, &profile))
    }

    /// Apply an analyst action, then refresh the owner's risk score
    pub async fn apply_review_action(&self, id: &str, action: ReviewAction) -> WorkflowResult<Transaction> {
        let updated = self.workflow.apply_review_action(id, action).await?;
        self.refresh_user_risk(&updated.created_by).await?;
        Ok(updated)
    }

    pub async fn update_kyc(&self, user_id: &str, action: KycAction) -> WorkflowResult<UserProfile> {
        self.workflow.update_kyc(user_id, action).await
    }

    /// One monitor pass, then a risk refresh for every user it touched
    pub async fn run_monitor(&self) -> WorkflowResult<MonitorReport> {
        let engine = self.engine();
        let report = self
            .monitor
            .run_once(
                self.transactions.as_ref(),
                &self.workflow,
                &engine,
                self.workflow.config().batch_limit,
            )
            .await?;

        for user in &report.affected_users {
            self.refresh_user_risk(user).await?;
        }
        Ok(report)
    }

    /// Recompute a user's summary and persist the score when it moved.
    /// Users without a profile are skipped.
    pub async fn refresh_user_risk(&self, user_id: &str) -> WorkflowResult<Option<UserRiskSummary>> {
        let profile = match self.profiles.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(err) => match WorkflowError::from(err) {
                WorkflowError::NotFound(_) => {
                    debug!(user = user_id, "no profile, risk refresh skipped");
                    return Ok(None);
                }
                other => return Err(other),
            },
        };

        let owned = self.owned_transactions(user_id).await?;
        let summary = self.summarize_user_risk(&owned, &profile);
        if profile.risk_score != Some(summary.score) {
            let patch = ProfilePatch {
                risk_score: Some(summary.score),
                ..Default::default()
            };
            self.profiles.update_profile(user_id, None, patch).await?;
            debug!(user = user_id, score = summary.score, level = %summary.level, "user risk score updated");
        }
        Ok(Some(summary))
    }

    /// Bulk insert. The whole batch is rejected if any record is malformed.
    pub async fn insert_transactions(&self, transactions: Vec<Transaction>) -> WorkflowResult<usize> {
        for tx in &transactions {
            tx.validate()?;
        }
        let count = self.transactions.insert_transactions(transactions).await?;
        info!(count, "transactions inserted");
        Ok(count)
    }

    pub async fn insert_profile(&self, profile: UserProfile) -> WorkflowResult<()> {
        Ok(self.profiles.insert_profile(profile).await?)
    }

    pub async fn list_profiles(&self) -> WorkflowResult<Vec<UserProfile>> {
        Ok(self.profiles.list_profiles().await?)
    }

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        order: SortOrder,
        limit: Option<usize>,
    ) -> WorkflowResult<Vec<Transaction>> {
        Ok(self.transactions.list_transactions(filter, order, limit).await?)
    }

    /// Compliance report alert as of now
    pub async fn generate_report(&self) -> WorkflowResult<Alert> {
        self.alerts.generate_report(Utc::now()).await
    }

    pub async fn overview(&self) -> WorkflowResult<ComplianceOverview> {
        let transactions = self
            .transactions
            .list_transactions(&TransactionFilter::new(), SortOrder::NewestFirst, None)
            .await?;
        let profiles = self.profiles.list_profiles().await?;

        let mut by_owner: HashMap<&str, Vec<Transaction>> = HashMap::new();
        for tx in &transactions {
            by_owner.entry(tx.created_by.as_str()).or_default().push(tx.clone());
        }

        let engine = self.engine();
        let high_risk_users = profiles
            .iter()
            .filter(|profile| {
                let owned = by_owner.get(profile.user_id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                engine.summarize_user_risk(owned, profile).level == RiskLevel::High
            })
            .count();

        Ok(ComplianceOverview {
            total_transactions: transactions.len(),
            flagged_transactions: transactions.iter().filter(|t| t.risk_flag != RiskFlag::None).count(),
            unread_alerts: self.alerts.unread_count().await?,
            pending_kyc: profiles.iter().filter(|p| p.kyc_status != KycStatus::Verified).count(),
            high_risk_users,
        })
    }

    async fn owned_transactions(&self, user_id: &str) -> WorkflowResult<Vec<Transaction>> {
        let filter = TransactionFilter::new().with_owner(user_id);
        Ok(self
            .transactions
            .list_transactions(&filter, SortOrder::NewestFirst, None)
            .await?)
    }
}
