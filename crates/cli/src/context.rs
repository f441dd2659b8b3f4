//! Application context - loads the dataset directory and wires the service

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use riskwatch_compliance::RuleCatalog;
use riskwatch_core::{Alert, Transaction, UserProfile, ValidationError};
use riskwatch_review::{ComplianceService, InMemoryStore, ReviewConfig, ReviewLedger, RiskMonitor};

pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const PROFILES_FILE: &str = "profiles.json";
pub const ALERTS_FILE: &str = "alerts.json";
/// Optional workflow settings (`ReviewConfig` as JSON)
pub const REVIEW_CONFIG_FILE: &str = "review.json";
pub const LEDGER_FILE: &str = "review.jsonl";
/// Fingerprint of the last fully applied monitor pass
pub const MONITOR_FILE: &str = "monitor.fingerprint";

/// Application context - the service over a dataset loaded from disk
pub struct AppContext {
    pub service: ComplianceService,
    store: Arc<InMemoryStore>,
    data_path: PathBuf,
}

impl AppContext {
    /// Load the dataset under `data_path`. Missing files are treated as empty.
    ///
    /// The catalog comes from `catalog` when given, else from the
    /// `RISKWATCH_CATALOG` file, else the built-in defaults.
    pub async fn open(data_path: impl AsRef<Path>, catalog: Option<&Path>) -> anyhow::Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_path)?;

        let transactions = read_list(&data_path.join(TRANSACTIONS_FILE), Transaction::list_from_json)?;
        let profiles = read_list(&data_path.join(PROFILES_FILE), UserProfile::list_from_json)?;
        let alerts = read_list(&data_path.join(ALERTS_FILE), Alert::list_from_json)?;
        debug!(
            transactions = transactions.len(),
            profiles = profiles.len(),
            alerts = alerts.len(),
            "dataset loaded"
        );

        let catalog = match catalog {
            Some(path) => RuleCatalog::from_file(path)?,
            None => RuleCatalog::from_env_or_default()?,
        };
        let config = read_review_config(&data_path.join(REVIEW_CONFIG_FILE))?;
        let ledger = ReviewLedger::open(data_path.join(LEDGER_FILE))?;

        let store = Arc::new(
            InMemoryStore::with_data(transactions, profiles, alerts)
                .with_context(|| format!("invalid records in {}", data_path.join(TRANSACTIONS_FILE).display()))?,
        );
        let mut service = ComplianceService::new(store.clone(), ledger, config, catalog)?;

        let monitor_path = data_path.join(MONITOR_FILE);
        if monitor_path.exists() {
            let fingerprint = std::fs::read_to_string(&monitor_path)?;
            service = service.with_monitor(RiskMonitor::resume(fingerprint.trim()));
        }

        Ok(Self {
            service,
            store,
            data_path,
        })
    }

    /// Write the dataset back, along with the monitor fingerprint
    pub async fn save(&self) -> anyhow::Result<()> {
        write_json(&self.data_path.join(TRANSACTIONS_FILE), &self.store.transactions_snapshot().await)?;
        write_json(&self.data_path.join(PROFILES_FILE), &self.store.profiles_snapshot().await)?;
        write_json(&self.data_path.join(ALERTS_FILE), &self.store.alerts_snapshot().await)?;

        if let Some(fingerprint) = self.service.monitor().last_fingerprint().await {
            std::fs::write(self.data_path.join(MONITOR_FILE), fingerprint)?;
        }
        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
}

fn read_list<T>(path: &Path, parse: fn(&str) -> Result<Vec<T>, ValidationError>) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)?;
    parse(&text).with_context(|| format!("invalid records in {}", path.display()))
}

fn read_review_config(path: &Path) -> anyhow::Result<ReviewConfig> {
    if !path.exists() {
        return Ok(ReviewConfig::default());
    }
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid review config {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
