//! Rule catalog - regulatory thresholds, rule weights and keyword lists
//!
//! All thresholds are configurable via file/env, not hardcoded.
//! The catalog is loaded once at process start and never mutated; a reload
//! replaces the whole value through [`CatalogHandle`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::analyzer::MAX_SCORE;
use crate::error::{ComplianceError, ComplianceResult};
use crate::finding::RuleId;

/// Environment variable naming a catalog JSON file
pub const CATALOG_ENV: &str = "RISKWATCH_CATALOG";

/// Upper bound on `history.lookback_days` (ten years)
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Immutable rule configuration injected into the analyzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleCatalog {
    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub weights: RiskWeights,

    #[serde(default)]
    pub keywords: KeywordLists,

    #[serde(default)]
    pub anomaly: AnomalyConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Regulatory thresholds (currency-denominated, INR by default)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Cash transaction reporting limit
    #[serde(default = "default_cash_limit")]
    pub cash_limit: Decimal,

    /// High-value transaction alert
    #[serde(default = "default_high_value")]
    pub high_value: Decimal,

    /// Suspicious transfer threshold
    #[serde(default = "default_suspicious_transfer")]
    pub suspicious_transfer: Decimal,

    /// Daily aggregate limit
    #[serde(default = "default_daily_aggregate")]
    pub daily_aggregate: Decimal,

    /// Structuring band lower edge (just below the cash limit)
    #[serde(default = "default_structuring_threshold")]
    pub structuring_threshold: Decimal,

    /// Transactions in a short window considered rapid
    #[serde(default = "default_rapid_count")]
    pub rapid_count: u32,

    /// Other in-band transactions needed in history for structuring
    #[serde(default = "default_structuring_min_history")]
    pub structuring_min_history: usize,
}

/// Integer score contribution per rule. The total score saturates at 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeights {
    #[serde(default = "default_offshore_weight")]
    pub offshore_transfer: u32,
    #[serde(default = "default_crypto_weight")]
    pub crypto_related: u32,
    #[serde(default = "default_cash_weight")]
    pub cash_intensive: u32,
    #[serde(default = "default_unknown_weight")]
    pub unknown_counterparty: u32,
    #[serde(default = "default_high_value_weight")]
    pub high_value: u32,
    #[serde(default = "default_structuring_weight")]
    pub structuring_pattern: u32,
    #[serde(default = "default_velocity_weight")]
    pub velocity_anomaly: u32,
}

/// Keyword lists backing the default counterparty matchers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordLists {
    #[serde(default = "default_offshore_keywords")]
    pub offshore: Vec<String>,
    #[serde(default = "default_crypto_keywords")]
    pub crypto: Vec<String>,
    #[serde(default = "default_unknown_keywords")]
    pub unknown: Vec<String>,
}

/// Batch anomaly detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Amounts strictly above this are always `high`
    #[serde(default = "default_high_value_ceiling")]
    pub high_value_ceiling: Decimal,

    /// Withdrawals strictly above this are at least `low`
    #[serde(default = "default_large_withdrawal_ceiling")]
    pub large_withdrawal_ceiling: Decimal,

    #[serde(default = "default_high_z")]
    pub high_z: f64,

    #[serde(default = "default_medium_z")]
    pub medium_z: f64,

    #[serde(default = "default_low_z")]
    pub low_z: f64,

    /// Minimum anomaly score reported when the ceiling fires
    #[serde(default = "default_ceiling_score_floor")]
    pub ceiling_score_floor: f64,
}

/// Lookback window used to build a transaction's recent history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Window half-width around the transaction, in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Most recent records kept in a history slice
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

// Default value functions for serde
fn default_cash_limit() -> Decimal {
    Decimal::new(200_000, 0)
}

fn default_high_value() -> Decimal {
    Decimal::new(1_000_000, 0)
}

fn default_suspicious_transfer() -> Decimal {
    Decimal::new(500_000, 0)
}

fn default_daily_aggregate() -> Decimal {
    Decimal::new(1_000_000, 0)
}

fn default_structuring_threshold() -> Decimal {
    Decimal::new(190_000, 0)
}

fn default_rapid_count() -> u32 {
    5
}

fn default_structuring_min_history() -> usize {
    2
}

fn default_offshore_weight() -> u32 {
    40
}

fn default_crypto_weight() -> u32 {
    35
}

fn default_cash_weight() -> u32 {
    25
}

fn default_unknown_weight() -> u32 {
    30
}

fn default_high_value_weight() -> u32 {
    20
}

fn default_structuring_weight() -> u32 {
    45
}

fn default_velocity_weight() -> u32 {
    30
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn default_offshore_keywords() -> Vec<String> {
    words(&["offshore", "international", "foreign", "overseas", "forex"])
}

fn default_crypto_keywords() -> Vec<String> {
    words(&["crypto", "bitcoin", "ethereum", "binance", "coinbase", "wazirx"])
}

fn default_unknown_keywords() -> Vec<String> {
    words(&["unknown", "anonymous", "unverified"])
}

fn default_high_value_ceiling() -> Decimal {
    Decimal::new(500_000, 0)
}

fn default_large_withdrawal_ceiling() -> Decimal {
    Decimal::new(100_000, 0)
}

fn default_high_z() -> f64 {
    2.5
}

fn default_medium_z() -> f64 {
    1.5
}

fn default_low_z() -> f64 {
    1.0
}

fn default_ceiling_score_floor() -> f64 {
    0.9
}

fn default_lookback_days() -> i64 {
    30
}

fn default_max_history() -> usize {
    100
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cash_limit: default_cash_limit(),
            high_value: default_high_value(),
            suspicious_transfer: default_suspicious_transfer(),
            daily_aggregate: default_daily_aggregate(),
            structuring_threshold: default_structuring_threshold(),
            rapid_count: default_rapid_count(),
            structuring_min_history: default_structuring_min_history(),
        }
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            offshore_transfer: default_offshore_weight(),
            crypto_related: default_crypto_weight(),
            cash_intensive: default_cash_weight(),
            unknown_counterparty: default_unknown_weight(),
            high_value: default_high_value_weight(),
            structuring_pattern: default_structuring_weight(),
            velocity_anomaly: default_velocity_weight(),
        }
    }
}

impl RiskWeights {
    /// Weight contributed by a fired rule
    pub fn weight(&self, rule: RuleId) -> u32 {
        match rule {
            RuleId::CashLimit => self.cash_intensive,
            RuleId::OffshoreTransfer => self.offshore_transfer,
            RuleId::CryptoTransaction => self.crypto_related,
            RuleId::UnknownCounterparty => self.unknown_counterparty,
            RuleId::HighValue => self.high_value,
            RuleId::Structuring => self.structuring_pattern,
        }
    }

    fn named(&self) -> [(&'static str, u32); 7] {
        [
            ("offshore_transfer", self.offshore_transfer),
            ("crypto_related", self.crypto_related),
            ("cash_intensive", self.cash_intensive),
            ("unknown_counterparty", self.unknown_counterparty),
            ("high_value", self.high_value),
            ("structuring_pattern", self.structuring_pattern),
            ("velocity_anomaly", self.velocity_anomaly),
        ]
    }
}

impl Default for KeywordLists {
    fn default() -> Self {
        Self {
            offshore: default_offshore_keywords(),
            crypto: default_crypto_keywords(),
            unknown: default_unknown_keywords(),
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            high_value_ceiling: default_high_value_ceiling(),
            large_withdrawal_ceiling: default_large_withdrawal_ceiling(),
            high_z: default_high_z(),
            medium_z: default_medium_z(),
            low_z: default_low_z(),
            ceiling_score_floor: default_ceiling_score_floor(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            max_history: default_max_history(),
        }
    }
}

impl HistoryConfig {
    /// Window half-width as chrono Duration
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.lookback_days).unwrap_or(chrono::Duration::MAX)
    }
}

impl RuleCatalog {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> ComplianceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog: RuleCatalog = serde_json::from_str(&content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load from the file named by `RISKWATCH_CATALOG`, or fall back to defaults
    pub fn from_env_or_default() -> ComplianceResult<Self> {
        match std::env::var(CATALOG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Reject internally inconsistent catalogs
    pub fn validate(&self) -> ComplianceResult<()> {
        let t = &self.thresholds;
        if t.structuring_threshold >= t.cash_limit {
            return Err(ComplianceError::Config(format!(
                "structuring_threshold {} must be below cash_limit {}",
                t.structuring_threshold, t.cash_limit
            )));
        }
        let a = &self.anomaly;
        if !(a.low_z <= a.medium_z && a.medium_z <= a.high_z) {
            return Err(ComplianceError::Config(
                "anomaly z thresholds must satisfy low <= medium <= high".to_string(),
            ));
        }
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.history.lookback_days) {
            return Err(ComplianceError::Config(format!(
                "lookback_days {} must be between 0 and {MAX_LOOKBACK_DAYS}",
                self.history.lookback_days
            )));
        }
        if let Some((name, weight)) = self.weights.named().into_iter().find(|(_, w)| *w > MAX_SCORE) {
            return Err(ComplianceError::Config(format!(
                "weight {name} = {weight} exceeds the maximum score {MAX_SCORE}"
            )));
        }
        Ok(())
    }
}

/// Shared, atomically replaceable catalog
///
/// Readers take an `Arc` snapshot and keep using it for the duration of a
/// batch; a reload swaps the pointer without touching in-flight snapshots.
#[derive(Debug)]
pub struct CatalogHandle {
    inner: RwLock<Arc<RuleCatalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self {
            inner: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Current catalog snapshot
    pub fn current(&self) -> Arc<RuleCatalog> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Replace the whole catalog after validating it
    pub fn replace(&self, catalog: RuleCatalog) -> ComplianceResult<()> {
        catalog.validate()?;
        let next = Arc::new(catalog);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        tracing::info!("rule catalog replaced");
        Ok(())
    }

    /// Reload from a JSON file
    pub fn reload_from(&self, path: &Path) -> ComplianceResult<()> {
        self.replace(RuleCatalog::from_file(path)?)
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(RuleCatalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_catalog() {
        let catalog = RuleCatalog::default();

        assert_eq!(catalog.thresholds.cash_limit, dec!(200000));
        assert_eq!(catalog.thresholds.high_value, dec!(1000000));
        assert_eq!(catalog.thresholds.suspicious_transfer, dec!(500000));
        assert_eq!(catalog.thresholds.daily_aggregate, dec!(1000000));
        assert_eq!(catalog.thresholds.structuring_threshold, dec!(190000));
        assert_eq!(catalog.thresholds.rapid_count, 5);
        assert_eq!(catalog.history.lookback_days, 30);
        assert_eq!(catalog.history.max_history, 100);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_weight_table() {
        let weights = RiskWeights::default();

        assert_eq!(weights.weight(RuleId::CashLimit), 25);
        assert_eq!(weights.weight(RuleId::OffshoreTransfer), 40);
        assert_eq!(weights.weight(RuleId::CryptoTransaction), 35);
        assert_eq!(weights.weight(RuleId::UnknownCounterparty), 30);
        assert_eq!(weights.weight(RuleId::HighValue), 20);
        assert_eq!(weights.weight(RuleId::Structuring), 45);
        assert_eq!(weights.velocity_anomaly, 30);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "thresholds": { "cash_limit": "300000" }, "weights": { "high_value": 50 } }"#;
        let catalog: RuleCatalog = serde_json::from_str(json).unwrap();

        assert_eq!(catalog.thresholds.cash_limit, dec!(300000));
        assert_eq!(catalog.thresholds.structuring_threshold, dec!(190000)); // default
        assert_eq!(catalog.weights.high_value, 50);
        assert_eq!(catalog.weights.cash_intensive, 25); // default
        assert_eq!(catalog.keywords.crypto.len(), 6);
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let mut catalog = RuleCatalog::default();
        catalog.thresholds.structuring_threshold = dec!(250000);

        assert!(matches!(catalog.validate(), Err(ComplianceError::Config(_))));
    }

    #[test]
    fn test_validate_bounds_weights_and_lookback() {
        let mut catalog = RuleCatalog::default();
        catalog.weights.offshore_transfer = u32::MAX;
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("offshore_transfer"));

        let mut catalog = RuleCatalog::default();
        catalog.weights.structuring_pattern = MAX_SCORE;
        assert!(catalog.validate().is_ok());

        let mut catalog = RuleCatalog::default();
        catalog.history.lookback_days = i64::MAX;
        assert!(matches!(catalog.validate(), Err(ComplianceError::Config(_))));
        catalog.history.lookback_days = -1;
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_oversized_weights_rejected_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{ "weights": { "offshore_transfer": 4294967295, "unknown_counterparty": 4294967295 } }"#,
        )
        .unwrap();

        assert!(matches!(RuleCatalog::from_file(&path), Err(ComplianceError::Config(_))));
    }

    #[test]
    fn test_lookback_saturates() {
        let history = HistoryConfig {
            lookback_days: i64::MAX,
            max_history: 10,
        };
        assert_eq!(history.lookback(), chrono::Duration::MAX);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"{ "history": { "lookback_days": 7 } }"#).unwrap();

        let catalog = RuleCatalog::from_file(&path).unwrap();
        assert_eq!(catalog.history.lookback_days, 7);
        assert_eq!(catalog.history.max_history, 100);
    }

    #[test]
    fn test_handle_replace_is_atomic() {
        let handle = CatalogHandle::default();
        let before = handle.current();

        let mut next = RuleCatalog::default();
        next.weights.high_value = 99;
        handle.replace(next).unwrap();

        // Old snapshot is untouched, new readers see the replacement
        assert_eq!(before.weights.high_value, 20);
        assert_eq!(handle.current().weights.high_value, 99);
    }

    #[test]
    fn test_handle_rejects_invalid_replacement() {
        let handle = CatalogHandle::default();
        let mut bad = RuleCatalog::default();
        bad.anomaly.low_z = 5.0;

        assert!(handle.replace(bad).is_err());
        assert_eq!(handle.current().anomaly.low_z, 1.0);
    }
}
