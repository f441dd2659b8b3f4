//! Compliance Engine - Main orchestrator
//!
//! Binds one catalog snapshot to the analyzer, detector and aggregator, and
//! merges rule and statistical output into a single [`RiskVerdict`] per
//! transaction.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use riskwatch_core::{RiskFlag, Transaction, UserProfile};

use crate::aggregator::{RiskAggregator, UserRiskSummary};
use crate::analyzer::{RiskAnalysisResult, TransactionAnalyzer};
use crate::anomaly::{AnomalyDetector, AnomalyVerdict, BatchStatistics};
use crate::config::RuleCatalog;
use crate::history::recent_history;
use crate::matcher::RuleMatchers;

/// Merged engine output for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// Storage id
    pub id: String,
    /// Most severe of the detector flag and the analyzer level
    pub risk_flag: RiskFlag,
    pub anomaly_score: f64,
    pub analysis: RiskAnalysisResult,
}

impl RiskVerdict {
    /// Combine detector and analyzer output.
    ///
    /// The analyzer only contributes when its result requires review, so a
    /// `low` analysis never raises a flag on its own.
    pub fn merge(anomaly: AnomalyVerdict, analysis: RiskAnalysisResult) -> Self {
        let rule_flag = if analysis.requires_review {
            RiskFlag::from(analysis.risk_level)
        } else {
            RiskFlag::None
        };

        Self {
            id: anomaly.id,
            risk_flag: anomaly.risk_flag.max(rule_flag),
            anomaly_score: anomaly.anomaly_score,
            analysis,
        }
    }

    /// Whether any catalog rule fired (as opposed to a purely statistical flag)
    pub fn has_findings(&self) -> bool {
        !self.analysis.findings.is_empty()
    }
}

/// Main Compliance Engine
///
/// Pure and synchronous: no I/O, no shared mutable state. A catalog reload
/// means building a new engine from the new snapshot.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    catalog: Arc<RuleCatalog>,
    analyzer: TransactionAnalyzer,
    detector: AnomalyDetector,
}

impl ComplianceEngine {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self {
            analyzer: TransactionAnalyzer::new(Arc::clone(&catalog)),
            detector: AnomalyDetector::new(catalog.anomaly.clone()),
            catalog,
        }
    }

    /// Replace the counterparty classifiers
    pub fn with_matchers(mut self, matchers: RuleMatchers) -> Self {
        self.analyzer = self.analyzer.with_matchers(matchers);
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn analyzer(&self) -> &TransactionAnalyzer {
        &self.analyzer
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Rule evaluation of one transaction against its history
    pub fn analyze_transaction(&self, tx: &Transaction, history: &[&Transaction]) -> RiskAnalysisResult {
        self.analyzer.analyze(tx, history)
    }

    /// Batch copy annotated with detector flags and scores
    pub fn detect_anomalies(&self, batch: &[Transaction]) -> Vec<Transaction> {
        self.detector.annotate(batch)
    }

    /// Per-user roll-up
    pub fn summarize_user_risk(&self, transactions: &[Transaction], profile: &UserProfile) -> UserRiskSummary {
        RiskAggregator::new(self.analyzer.clone()).summarize(transactions, profile)
    }

    /// Full evaluation of a batch: statistics first, then per-transaction
    /// detection and rule analysis in parallel. Output is in input order.
    pub fn evaluate_batch(&self, batch: &[Transaction]) -> Vec<RiskVerdict> {
        let stats = BatchStatistics::compute(batch);
        debug!(count = stats.count, "evaluating batch");

        batch
            .par_iter()
            .map(|tx| {
                let anomaly = self.detector.classify(tx, &stats);
                let history = recent_history(batch, tx, &self.catalog.history);
                let analysis = self.analyzer.analyze(tx, &history);
                RiskVerdict::merge(anomaly, analysis)
            })
            .collect()
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new(Arc::new(RuleCatalog::default()))
    }
}
