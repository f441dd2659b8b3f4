//! RiskWatch Compliance Engine
//!
//! Regulatory rule checks, statistical anomaly detection and user-level risk
//! roll-up over transaction records.
//!
//! ## Data flow
//!
//! ```text
//! batch ──► AnomalyDetector (μ/σ once, then per-tx flags)
//!   │                         │
//!   └──► TransactionAnalyzer (rules + recent history)
//!                             │
//!                             ▼
//!                       RiskVerdict (merged flag)
//!                             │
//!                             ▼
//!          review workflow ──► RiskAggregator (per-user summary)
//! ```
//!
//! ## Key Components
//!
//! - [`config::RuleCatalog`] - Thresholds, weights and keyword lists (not hardcoded)
//! - [`config::CatalogHandle`] - Atomically replaceable catalog snapshot
//! - [`matcher::CounterpartyMatcher`] - Pluggable counterparty classification
//! - [`analyzer::TransactionAnalyzer`] - Pure per-transaction rule evaluation
//! - [`anomaly::AnomalyDetector`] - Batch-relative z-score flagging
//! - [`aggregator::RiskAggregator`] - Per-user risk summary
//! - [`engine::ComplianceEngine`] - Orchestrator producing merged verdicts

pub mod aggregator;
pub mod analyzer;
pub mod anomaly;
pub mod config;
pub mod engine;
pub mod error;
pub mod finding;
pub mod history;
pub mod matcher;

pub use aggregator::{RiskAggregator, UserRiskSummary};
pub use analyzer::{RiskAnalysisResult, TransactionAnalyzer};
pub use anomaly::{AnomalyDetector, AnomalyVerdict, BatchStatistics};
pub use config::{CatalogHandle, RuleCatalog};
pub use engine::{ComplianceEngine, RiskVerdict};
pub use error::{ComplianceError, ComplianceResult};
pub use finding::{ComplianceFinding, RuleId, Severity};
pub use history::recent_history;
pub use matcher::{CounterpartyMatcher, KeywordMatcher, MatchScope, RuleMatchers};
