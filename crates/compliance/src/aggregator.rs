//! Risk Aggregator - per-user roll-up of transaction risk
//!
//! A [`UserRiskSummary`] is a pure function of the user's transactions and
//! profile. It may be cached but is always re-derivable.

use serde::{Deserialize, Serialize};

use riskwatch_core::{RiskLevel, Transaction, UserProfile};

use crate::analyzer::TransactionAnalyzer;

/// High-risk transactions that make a user high risk on their own
pub const HIGH_RISK_COUNT_THRESHOLD: usize = 3;

/// Average score at or above which a user is high risk
pub const HIGH_AVERAGE: f64 = 50.0;

/// Average score at or above which a user is medium risk
pub const MEDIUM_AVERAGE: f64 = 25.0;

/// Bonus added to the score of a high-risk user (saturating at 100)
pub const HIGH_RISK_BONUS: u32 = 20;

/// Advisory factor emitted when KYC is not verified
pub const KYC_INCOMPLETE_FACTOR: &str = "KYC verification incomplete";

/// Per-user aggregate risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRiskSummary {
    pub level: RiskLevel,
    /// Score in `0..=100`
    pub score: u8,
    /// Advisory context, not used for the level
    pub factors: Vec<String>,
    pub high_risk_count: usize,
}

impl UserRiskSummary {
    /// Summary of a user with no transactions
    pub fn empty() -> Self {
        Self {
            level: RiskLevel::Low,
            score: 0,
            factors: Vec::new(),
            high_risk_count: 0,
        }
    }
}

/// Rolls per-transaction analysis up to the user level
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    analyzer: TransactionAnalyzer,
}

impl RiskAggregator {
    pub fn new(analyzer: TransactionAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Summarize one user's transactions.
    ///
    /// Every transaction is analyzed against its own history slice of
    /// `transactions`; the set is expected to belong to `profile`'s user.
    pub fn summarize(&self, transactions: &[Transaction], profile: &UserProfile) -> UserRiskSummary {
        if transactions.is_empty() {
            return UserRiskSummary::empty();
        }

        let analyses = self.analyzer.analyze_all(transactions);
        let total: u32 = analyses.iter().map(|a| u32::from(a.risk_score)).sum();
        let average = f64::from(total) / analyses.len() as f64;
        let high_risk_count = analyses
            .iter()
            .filter(|a| a.risk_level == RiskLevel::High)
            .count();

        let mut factors = Vec::new();
        if high_risk_count > 0 {
            factors.push(format!("{high_risk_count} high-risk transactions detected"));
        }
        if !profile.is_kyc_verified() {
            factors.push(KYC_INCOMPLETE_FACTOR.to_string());
        }

        // average is within 0..=100, so the rounded value fits
        let rounded = average.round() as u32;
        let (level, score) = if high_risk_count >= HIGH_RISK_COUNT_THRESHOLD || average >= HIGH_AVERAGE {
            (RiskLevel::High, (rounded + HIGH_RISK_BONUS).min(100))
        } else if high_risk_count >= 1 || average >= MEDIUM_AVERAGE {
            (RiskLevel::Medium, rounded)
        } else {
            (RiskLevel::Low, rounded)
        };

        UserRiskSummary {
            level,
            score: score.min(100) as u8,
            factors,
            high_risk_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleCatalog;
    use chrono::{Duration, TimeZone, Utc};
    use riskwatch_core::{Amount, KycStatus, TransactionType};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn aggregator() -> RiskAggregator {
        RiskAggregator::new(TransactionAnalyzer::new(Arc::new(RuleCatalog::default())))
    }

    fn tx(i: i64, amount: Decimal, counterparty: Option<&str>) -> Transaction {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let t = Transaction::new(format!("TXN-{i}"), Amount::new(amount).unwrap(), TransactionType::Transfer, "user-1")
            .with_id(format!("t{i}"))
            .created_at(base + Duration::days(i));
        match counterparty {
            Some(cp) => t.with_counterparty(cp),
            None => t,
        }
    }

    #[test]
    fn test_empty_is_low_for_any_profile() {
        let unverified = UserProfile::new("user-1");
        let verified = UserProfile::new("user-1").with_kyc_status(KycStatus::Verified);

        assert_eq!(aggregator().summarize(&[], &unverified), UserRiskSummary::empty());
        assert_eq!(aggregator().summarize(&[], &verified), UserRiskSummary::empty());
    }

    #[test]
    fn test_clean_verified_user() {
        let profile = UserProfile::new("user-1").with_kyc_status(KycStatus::Verified);
        let txs = vec![tx(0, dec!(1000), None), tx(1, dec!(2000), Some("HDFC Bank"))];

        let summary = aggregator().summarize(&txs, &profile);
        assert_eq!(summary.level, RiskLevel::Low);
        assert_eq!(summary.score, 0);
        assert!(summary.factors.is_empty());
        assert_eq!(summary.high_risk_count, 0);
    }

    #[test]
    fn test_unverified_kyc_adds_factor_only() {
        let profile = UserProfile::new("user-1");
        let summary = aggregator().summarize(&[tx(0, dec!(1000), None)], &profile);

        assert_eq!(summary.level, RiskLevel::Low);
        assert_eq!(summary.factors, vec![KYC_INCOMPLETE_FACTOR.to_string()]);
    }

    #[test]
    fn test_single_high_risk_transaction_is_medium() {
        let profile = UserProfile::new("user-1").with_kyc_status(KycStatus::Verified);
        // 70 + 0 + 0 + 0 -> average 17.5
        let txs = vec![
            tx(0, dec!(1000), Some("Unknown Offshore Ltd")),
            tx(1, dec!(1000), None),
            tx(2, dec!(1000), None),
            tx(3, dec!(1000), None),
        ];

        let summary = aggregator().summarize(&txs, &profile);
        assert_eq!(summary.level, RiskLevel::Medium);
        assert_eq!(summary.score, 18);
        assert_eq!(summary.high_risk_count, 1);
        assert_eq!(summary.factors, vec!["1 high-risk transactions detected".to_string()]);
    }

    #[test]
    fn test_high_average_bumps_score() {
        let profile = UserProfile::new("user-1");
        // 70 and 40 -> average 55 -> high, 55 + 20 = 75
        let txs = vec![
            tx(0, dec!(1000), Some("Unknown Offshore Ltd")),
            tx(1, dec!(1000), Some("Overseas Partner")),
        ];

        let summary = aggregator().summarize(&txs, &profile);
        assert_eq!(summary.level, RiskLevel::High);
        assert_eq!(summary.score, 75);
        assert_eq!(summary.factors.len(), 2);
    }

    #[test]
    fn test_high_score_is_capped() {
        let profile = UserProfile::new("user-1");
        let txs: Vec<Transaction> = (0..3)
            .map(|i| tx(i, dec!(2500000), Some("anonymous binance overseas")))
            .collect();

        let summary = aggregator().summarize(&txs, &profile);
        assert_eq!(summary.level, RiskLevel::High);
        assert_eq!(summary.high_risk_count, 3);
        assert_eq!(summary.score, 100);
    }

    #[test]
    fn test_summarize_is_pure() {
        let profile = UserProfile::new("user-1");
        let txs = vec![tx(0, dec!(195000), None), tx(1, dec!(196000), None), tx(2, dec!(197000), None)];
        let snapshot = txs.clone();

        let first = aggregator().summarize(&txs, &profile);
        let second = aggregator().summarize(&txs, &profile);
        assert_eq!(first, second);
        assert_eq!(txs, snapshot);
        // three structuring hits of 45 -> average 45 -> medium
        assert_eq!(first.level, RiskLevel::Medium);
        assert_eq!(first.score, 45);
    }
}
