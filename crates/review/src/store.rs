//! Collaborator storage contracts and the in-memory reference store
//!
//! Persistence is external to the engine. The workflow only relies on these
//! traits: filtered reads, per-record atomic updates guarded by a
//! compare-and-set on the fields the transition read, and alert writes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use riskwatch_core::{
    Alert, KycStatus, ReviewState, RiskFlag, Transaction, TransactionStatus, TransactionType,
    UserProfile,
};

/// Errors from a storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The stored record no longer matches the expected snapshot
    #[error("Compare-and-set failed for {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Insert of an id that is already stored, or repeated within the batch
    #[error("Duplicate id: {0}")]
    Duplicate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ordering by `created_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Transaction list filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Case-insensitive substring of transaction id or counterparty
    pub search: Option<String>,
    pub tx_type: Option<TransactionType>,
    pub risk_flag: Option<RiskFlag>,
    pub status: Option<TransactionStatus>,
    /// Inclusive lower bound on `created_date`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_date`
    pub to: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    /// Inclusive amount range
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_type(mut self, tx_type: TransactionType) -> Self {
        self.tx_type = Some(tx_type);
        self
    }

    pub fn with_risk_flag(mut self, risk_flag: RiskFlag) -> Self {
        self.risk_flag = Some(risk_flag);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_amount_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    /// Whether a transaction passes every set criterion
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            let in_id = tx.transaction_id.to_lowercase().contains(&needle);
            let in_counterparty = tx
                .counterparty
                .as_deref()
                .is_some_and(|cp| cp.to_lowercase().contains(&needle));
            if !needle.is_empty() && !in_id && !in_counterparty {
                return false;
            }
        }
        if self.tx_type.is_some_and(|t| t != tx.tx_type) {
            return false;
        }
        if self.risk_flag.is_some_and(|f| f != tx.risk_flag) {
            return false;
        }
        if self.status.is_some_and(|s| s != tx.status) {
            return false;
        }
        if self.from.is_some_and(|from| tx.created_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| tx.created_date > to) {
            return false;
        }
        if self.min_amount.is_some_and(|min| tx.amount.value() < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| tx.amount.value() > max) {
            return false;
        }
        if let Some(owner) = &self.owner {
            if &tx.created_by != owner {
                return false;
            }
        }
        true
    }
}

/// Partial update of a transaction's review fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub status: Option<TransactionStatus>,
    pub risk_flag: Option<RiskFlag>,
    pub anomaly_score: Option<f64>,
    pub notes: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.risk_flag.is_none() && self.anomaly_score.is_none() && self.notes.is_none()
    }

    pub fn apply(&self, tx: &mut Transaction) {
        if let Some(status) = self.status {
            tx.status = status;
        }
        if let Some(flag) = self.risk_flag {
            tx.risk_flag = flag;
        }
        if let Some(score) = self.anomaly_score {
            tx.anomaly_score = score;
        }
        if let Some(notes) = &self.notes {
            tx.notes = Some(notes.clone());
        }
    }
}

/// Partial update of a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub risk_score: Option<u8>,
    pub kyc_status: Option<KycStatus>,
}

/// Transaction read/write contract
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Filtered, ordered, optionally limited listing
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        order: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Transaction>>;

    async fn get_transaction(&self, id: &str) -> StoreResult<Transaction>;

    /// Atomic per-record update. When `expected` is set the write only
    /// happens if the stored review state still equals it.
    async fn update_transaction(
        &self,
        id: &str,
        expected: Option<ReviewState>,
        patch: TransactionPatch,
    ) -> StoreResult<Transaction>;

    /// Insert a batch of new records; returns the count. The batch is
    /// rejected as a whole with `Duplicate` if any id is already stored.
    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<usize>;
}

/// User profile read/write contract
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>>;

    async fn get_profile(&self, user_id: &str) -> StoreResult<UserProfile>;

    /// Atomic per-profile update. When `expected_kyc` is set the write only
    /// happens if the stored KYC status still equals it.
    async fn update_profile(
        &self,
        user_id: &str,
        expected_kyc: Option<KycStatus>,
        patch: ProfilePatch,
    ) -> StoreResult<UserProfile>;

    async fn insert_profile(&self, profile: UserProfile) -> StoreResult<()>;
}

/// Alert write/management contract
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn create_alert(&self, alert: Alert) -> StoreResult<Alert>;

    /// All alerts, newest first
    async fn list_alerts(&self) -> StoreResult<Vec<Alert>>;

    async fn mark_read(&self, id: &str) -> StoreResult<Alert>;

    /// Returns the number of alerts that changed
    async fn mark_all_read(&self) -> StoreResult<usize>;

    async fn delete_alert(&self, id: &str) -> StoreResult<()>;
}

/// In-process reference store backing every contract
#[derive(Debug, Default)]
pub struct InMemoryStore {
    transactions: RwLock<HashMap<String, Transaction>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
    alerts: RwLock<Vec<Alert>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a dataset. Fails on repeated transaction ids.
    pub fn with_data(
        transactions: Vec<Transaction>,
        profiles: Vec<UserProfile>,
        alerts: Vec<Alert>,
    ) -> StoreResult<Self> {
        let mut by_id = HashMap::with_capacity(transactions.len());
        check_new_ids(&by_id, &transactions)?;
        by_id.extend(transactions.into_iter().map(|t| (t.id.clone(), t)));

        Ok(Self {
            transactions: RwLock::new(by_id),
            profiles: RwLock::new(profiles.into_iter().map(|p| (p.user_id.clone(), p)).collect()),
            alerts: RwLock::new(alerts),
            offline: AtomicBool::new(false),
        })
    }

    /// Simulate a collaborator outage: every call fails with `Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// All transactions, oldest first (for export)
    pub async fn transactions_snapshot(&self) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self.transactions.read().await.values().cloned().collect();
        sort_transactions(&mut txs, SortOrder::OldestFirst);
        txs
    }

    /// All profiles ordered by user id (for export)
    pub async fn profiles_snapshot(&self) -> Vec<UserProfile> {
        let mut profiles: Vec<UserProfile> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        profiles
    }

    /// All alerts in insertion order (for export)
    pub async fn alerts_snapshot(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }
}

fn check_new_ids(stored: &HashMap<String, Transaction>, batch: &[Transaction]) -> StoreResult<()> {
    let mut seen = HashSet::with_capacity(batch.len());
    for tx in batch {
        if stored.contains_key(&tx.id) || !seen.insert(tx.id.as_str()) {
            return Err(StoreError::Duplicate(tx.id.clone()));
        }
    }
    Ok(())
}

fn sort_transactions(txs: &mut [Transaction], order: SortOrder) {
    txs.sort_by(|a, b| a.created_date.cmp(&b.created_date).then_with(|| a.id.cmp(&b.id)));
    if order == SortOrder::NewestFirst {
        txs.reverse();
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        order: SortOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Transaction>> {
        self.check_online()?;
        let mut txs: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort_transactions(&mut txs, order);
        if let Some(limit) = limit {
            txs.truncate(limit);
        }
        Ok(txs)
    }

    async fn get_transaction(&self, id: &str) -> StoreResult<Transaction> {
        self.check_online()?;
        self.transactions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_transaction(
        &self,
        id: &str,
        expected: Option<ReviewState>,
        patch: TransactionPatch,
    ) -> StoreResult<Transaction> {
        self.check_online()?;
        let mut txs = self.transactions.write().await;
        let tx = txs.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if expected.is_some_and(|state| state != tx.review_state()) {
            return Err(StoreError::Conflict(id.to_string()));
        }

        patch.apply(tx);
        Ok(tx.clone())
    }

    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<usize> {
        self.check_online()?;
        let mut txs = self.transactions.write().await;
        check_new_ids(&txs, &transactions)?;
        let count = transactions.len();
        txs.extend(transactions.into_iter().map(|t| (t.id.clone(), t)));
        Ok(count)
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn list_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        self.check_online()?;
        Ok(self.profiles_snapshot().await)
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<UserProfile> {
        self.check_online()?;
        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        expected_kyc: Option<KycStatus>,
        patch: ProfilePatch,
    ) -> StoreResult<UserProfile> {
        self.check_online()?;
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;

        if expected_kyc.is_some_and(|kyc| kyc != profile.kyc_status) {
            return Err(StoreError::Conflict(user_id.to_string()));
        }

        if let Some(score) = patch.risk_score {
            profile.risk_score = Some(score);
        }
        if let Some(kyc) = patch.kyc_status {
            profile.kyc_status = kyc;
        }
        profile.updated_date = Utc::now();
        Ok(profile.clone())
    }

    async fn insert_profile(&self, profile: UserProfile) -> StoreResult<()> {
        self.check_online()?;
        self.profiles.write().await.insert(profile.user_id.clone(), profile);
        Ok(())
    }
}

#[async_trait]
impl AlertStore for InMemoryStore {
    async fn create_alert(&self, alert: Alert) -> StoreResult<Alert> {
        self.check_online()?;
        self.alerts.write().await.push(alert.clone());
        Ok(alert)
    }

    async fn list_alerts(&self) -> StoreResult<Vec<Alert>> {
        self.check_online()?;
        let mut alerts = self.alerts.read().await.clone();
        // later inserts first among equal timestamps
        alerts.reverse();
        alerts.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        Ok(alerts)
    }

    async fn mark_read(&self, id: &str) -> StoreResult<Alert> {
        self.check_online()?;
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        alert.is_read = true;
        Ok(alert.clone())
    }

    async fn mark_all_read(&self) -> StoreResult<usize> {
        self.check_online()?;
        let mut alerts = self.alerts.write().await;
        let mut changed = 0;
        for alert in alerts.iter_mut().filter(|a| !a.is_read) {
            alert.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_alert(&self, id: &str) -> StoreResult<()> {
        self.check_online()?;
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        if alerts.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
