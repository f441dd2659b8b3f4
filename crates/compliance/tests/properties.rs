//! Behavioural properties of the analyzer, detector and aggregator

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use riskwatch_compliance::{
    recent_history, AnomalyDetector, ComplianceEngine, RiskAggregator, RuleCatalog, RuleId,
    TransactionAnalyzer,
};
use riskwatch_core::{Amount, KycStatus, RiskFlag, RiskLevel, Transaction, TransactionType, UserProfile};

const TYPES: [TransactionType; 5] = [
    TransactionType::Deposit,
    TransactionType::Withdrawal,
    TransactionType::Transfer,
    TransactionType::Investment,
    TransactionType::Redemption,
];

fn analyzer() -> TransactionAnalyzer {
    TransactionAnalyzer::new(Arc::new(RuleCatalog::default()))
}

fn tx(i: i64, amount: Decimal, tx_type: TransactionType) -> Transaction {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    Transaction::new(format!("TXN{i:04}"), Amount::new(amount).unwrap(), tx_type, "user-1")
        .with_id(format!("id-{i}"))
        .with_category("Salary")
        .with_counterparty("HDFC Bank")
        .created_at(base + Duration::hours(i))
}

#[test]
fn test_small_clean_amounts_are_always_low() {
    let a = analyzer();
    let amounts = [dec!(0), dec!(1), dec!(999.99), dec!(50000), dec!(150000), dec!(189999.99)];
    let history: Vec<Transaction> = (100..105).map(|i| tx(i, dec!(195000), TransactionType::Deposit)).collect();
    let history_refs: Vec<&Transaction> = history.iter().collect();

    for (i, amount) in amounts.into_iter().enumerate() {
        for tx_type in TYPES {
            let result = a.analyze(&tx(i as i64, amount, tx_type), &history_refs);
            assert_eq!(result.risk_level, RiskLevel::Low);
            assert_eq!(result.risk_score, 0);
            assert!(result.findings.is_empty());
        }
    }
}

#[test]
fn test_score_is_bounded_and_monotonic_in_fired_rules() {
    let a = analyzer();
    let counterparties = ["HDFC Bank", "Overseas Ltd", "Overseas Binance", "Unknown Overseas Binance"];
    let mut previous = 0u8;

    for (i, cp) in counterparties.iter().enumerate() {
        let t = tx(i as i64, dec!(2500000), TransactionType::Withdrawal).with_counterparty(*cp);
        let result = a.analyze(&t, &[]);

        assert!(result.risk_score <= 100);
        assert!(result.risk_score >= previous);
        previous = result.risk_score;
    }
    assert_eq!(previous, 100);
}

#[test]
fn test_structuring_iff_three_in_band() {
    let a = analyzer();
    let in_band = [dec!(190000), dec!(195000), dec!(199999.99)];

    for others in 0..=3usize {
        let history: Vec<Transaction> = (0..others)
            .map(|i| tx(10 + i as i64, in_band[i % in_band.len()], TransactionType::Deposit))
            .collect();
        let refs: Vec<&Transaction> = history.iter().collect();

        for amount in in_band {
            let result = a.analyze(&tx(0, amount, TransactionType::Deposit), &refs);
            assert_eq!(result.has_finding(RuleId::Structuring), others >= 2);
        }

        // A target outside the band never fires, whatever the history
        for amount in [dec!(189999.99), dec!(200000)] {
            let result = a.analyze(&tx(0, amount, TransactionType::Deposit), &refs);
            assert!(!result.has_finding(RuleId::Structuring));
        }
    }
}

#[test]
fn test_analyze_is_deterministic_across_calls() {
    let a = analyzer();
    let history: Vec<Transaction> = (1..4).map(|i| tx(i, dec!(196000), TransactionType::Deposit)).collect();
    let refs: Vec<&Transaction> = history.iter().collect();
    let t = tx(0, dec!(197000), TransactionType::Withdrawal).with_counterparty("Anonymous");

    let results: Vec<_> = (0..5).map(|_| a.analyze(&t, &refs)).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_equal_amounts_are_never_flagged_from_z() {
    let detector = AnomalyDetector::default();
    for amount in [dec!(10), dec!(99999), dec!(500000)] {
        let batch: Vec<Transaction> = (0..6).map(|i| tx(i, amount, TransactionType::Deposit)).collect();
        let verdicts = detector.detect(&batch);

        assert!(verdicts.iter().all(|v| v.risk_flag == RiskFlag::None));
        assert!(verdicts.iter().all(|v| v.anomaly_score == 0.0));
    }

    // Crossing the absolute ceiling still flags
    let batch: Vec<Transaction> = (0..6).map(|i| tx(i, dec!(500001), TransactionType::Deposit)).collect();
    assert!(detector.detect(&batch).iter().all(|v| v.risk_flag == RiskFlag::High));
}

#[test]
fn test_empty_summary_for_every_kyc_status() {
    let aggregator = RiskAggregator::new(analyzer());
    for status in [KycStatus::Pending, KycStatus::InProgress, KycStatus::Verified, KycStatus::Rejected] {
        let summary = aggregator.summarize(&[], &UserProfile::new("user-1").with_kyc_status(status));

        assert_eq!(summary.level, RiskLevel::Low);
        assert_eq!(summary.score, 0);
        assert!(summary.factors.is_empty());
    }
}

#[test]
fn test_scenario_cash_withdrawal() {
    let t = tx(0, dec!(250000), TransactionType::Withdrawal);
    let result = analyzer().analyze(&t, &[]);

    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].rule.code(), "RBI_CASH_LIMIT");
    assert_eq!(result.risk_score, 25);
    assert_eq!(result.risk_level, RiskLevel::Low);
}

#[test]
fn test_scenario_high_value() {
    let t = tx(0, dec!(1200000), TransactionType::Deposit);
    let result = analyzer().analyze(&t, &[]);

    assert_eq!(result.risk_score, 20);
    assert_eq!(result.risk_level, RiskLevel::Low);
}

#[test]
fn test_scenario_structuring_batch() {
    let a = analyzer();
    let batch = vec![
        tx(0, dec!(195000), TransactionType::Deposit),
        tx(1, dec!(196000), TransactionType::Deposit),
        tx(2, dec!(197000), TransactionType::Deposit),
    ];

    for t in &batch {
        let history = recent_history(&batch, t, &a.catalog().history);
        assert_eq!(history.len(), 2);

        let result = a.analyze(t, &history);
        assert!(result.has_finding(RuleId::Structuring));
        assert!(result.risk_score >= 45);
        assert!(matches!(result.risk_level, RiskLevel::Medium | RiskLevel::High));
    }
}

#[test]
fn test_scenario_outlier_batch() {
    let amounts = [
        dec!(10000),
        dec!(10250),
        dec!(9750),
        dec!(10100),
        dec!(9900),
        dec!(10050),
        dec!(9950),
        dec!(10300),
        dec!(9700),
        dec!(600000),
    ];
    let batch: Vec<Transaction> = amounts
        .iter()
        .enumerate()
        .map(|(i, a)| tx(i as i64, *a, TransactionType::Deposit))
        .collect();

    let verdicts = ComplianceEngine::default().evaluate_batch(&batch);
    assert_eq!(verdicts[9].risk_flag, RiskFlag::High);
    assert!(verdicts[9].anomaly_score > 2.5);
    for verdict in &verdicts[..9] {
        assert_eq!(verdict.risk_flag, RiskFlag::None);
    }
}
