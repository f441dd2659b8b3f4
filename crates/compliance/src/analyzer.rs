//! Transaction Analyzer - rule evaluation for a single transaction
//!
//! Each check either fires (appends a finding and adds its weight) or does
//! not. The score saturates at 100 and is bucketed into a [`RiskLevel`].
//! `analyze` is pure: identical `(transaction, history)` always yields an
//! identical [`RiskAnalysisResult`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use riskwatch_core::{RiskLevel, Transaction, TransactionType};

use crate::config::RuleCatalog;
use crate::finding::{ComplianceFinding, RuleId};
use crate::history::recent_history;
use crate::matcher::RuleMatchers;

/// Upper bound of the saturated score
pub const MAX_SCORE: u32 = 100;

/// Output of one analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAnalysisResult {
    /// Human-readable reference of the analyzed transaction
    pub transaction_id: String,
    pub risk_level: RiskLevel,
    /// Saturated score in `0..=100`
    pub risk_score: u8,
    /// Fired rules in evaluation order
    pub findings: Vec<ComplianceFinding>,
    pub requires_review: bool,
    /// Reference instant of the evaluation (the transaction's `created_date`)
    pub timestamp: DateTime<Utc>,
}

impl RiskAnalysisResult {
    /// Whether a given rule fired
    pub fn has_finding(&self, rule: RuleId) -> bool {
        self.findings.iter().any(|f| f.rule == rule)
    }
}

/// Rule evaluator bound to one catalog snapshot
#[derive(Debug, Clone)]
pub struct TransactionAnalyzer {
    catalog: Arc<RuleCatalog>,
    matchers: RuleMatchers,
}

impl TransactionAnalyzer {
    /// Analyzer with keyword matchers taken from the catalog
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        let matchers = RuleMatchers::from_keywords(&catalog.keywords);
        Self { catalog, matchers }
    }

    /// Replace the counterparty classifiers
    pub fn with_matchers(mut self, matchers: RuleMatchers) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Evaluate `tx` against the catalog and its recent history.
    ///
    /// `history` must not contain `tx` itself.
    pub fn analyze(&self, tx: &Transaction, history: &[&Transaction]) -> RiskAnalysisResult {
        let thresholds = &self.catalog.thresholds;
        let amount = tx.amount.value();
        let mut findings = Vec::new();

        if amount >= thresholds.cash_limit && is_cash_like(tx) {
            findings.push(ComplianceFinding::new(
                RuleId::CashLimit,
                format!(
                    "Cash transaction of ₹{} exceeds ₹{} reporting threshold",
                    format_inr(amount),
                    format_inr(thresholds.cash_limit)
                ),
            ));
        }

        if self.matchers.offshore.matches(tx) {
            findings.push(ComplianceFinding::new(
                RuleId::OffshoreTransfer,
                "International transfer detected - requires FEMA compliance check",
            ));
        }

        if self.matchers.crypto.matches(tx) {
            findings.push(ComplianceFinding::new(
                RuleId::CryptoTransaction,
                "Cryptocurrency transaction - RBI advisory compliance required",
            ));
        }

        if self.matchers.unknown.matches(tx) {
            findings.push(ComplianceFinding::new(
                RuleId::UnknownCounterparty,
                "Transaction with unverified/unknown party - KYC verification required",
            ));
        }

        if amount >= thresholds.high_value {
            findings.push(ComplianceFinding::new(
                RuleId::HighValue,
                format!("High-value transaction of ₹{} flagged for review", format_inr(amount)),
            ));
        }

        if self.in_structuring_band(amount) {
            let similar = history
                .iter()
                .filter(|other| self.in_structuring_band(other.amount.value()))
                .count();
            if similar >= thresholds.structuring_min_history {
                findings.push(ComplianceFinding::new(
                    RuleId::Structuring,
                    "Potential structuring detected - multiple transactions just below reporting threshold",
                ));
            }
        }

        let total = findings
            .iter()
            .map(|f| self.catalog.weights.weight(f.rule))
            .fold(0u32, u32::saturating_add);
        let risk_score = total.min(MAX_SCORE) as u8;
        let risk_level = RiskLevel::from_score(risk_score);

        debug!(
            transaction = tx.reference(),
            score = risk_score,
            level = %risk_level,
            findings = findings.len(),
            "transaction analyzed"
        );

        RiskAnalysisResult {
            transaction_id: tx.reference().to_string(),
            risk_level,
            risk_score,
            findings,
            requires_review: risk_level != RiskLevel::Low,
            timestamp: tx.created_date,
        }
    }

    /// Analyze every transaction against its own history slice of `txs`.
    ///
    /// Results are in input order.
    pub fn analyze_all(&self, txs: &[Transaction]) -> Vec<RiskAnalysisResult> {
        txs.par_iter()
            .map(|tx| {
                let history = recent_history(txs, tx, &self.catalog.history);
                self.analyze(tx, &history)
            })
            .collect()
    }

    fn in_structuring_band(&self, amount: Decimal) -> bool {
        let t = &self.catalog.thresholds;
        amount >= t.structuring_threshold && amount < t.cash_limit
    }
}

fn is_cash_like(tx: &Transaction) -> bool {
    tx.tx_type == TransactionType::Withdrawal || tx.category.trim().eq_ignore_ascii_case("cash")
}

/// Render an amount with Indian digit grouping (`12,50,000`)
pub fn format_inr(amount: Decimal) -> String {
    let rounded = amount.round_dp(3).normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::new();
    if int_part.len() <= 3 {
        grouped.push_str(int_part);
    } else {
        let (head, tail) = int_part.split_at(int_part.len() - 3);
        let lead = head.len() % 2;
        if lead == 1 {
            grouped.push_str(&head[..1]);
        }
        for (i, pair) in head.as_bytes()[lead..].chunks(2).enumerate() {
            if i > 0 || lead == 1 {
                grouped.push(',');
            }
            grouped.push_str(&String::from_utf8_lossy(pair));
        }
        grouped.push(',');
        grouped.push_str(tail);
    }

    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}
