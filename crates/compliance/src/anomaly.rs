//! Anomaly Detector - batch-relative outlier flagging
//!
//! Two phases: [`BatchStatistics`] is computed once over the whole batch,
//! then every transaction is classified independently against it. Flags are
//! relative to the batch composition; callers re-run detection whenever the
//! reference population changes.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use riskwatch_core::{RiskFlag, Transaction, TransactionType};

use crate::config::AnomalyConfig;

/// Population statistics of a batch's amounts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation, with 0 replaced by 1
    pub std_dev: f64,
}

impl BatchStatistics {
    pub fn compute(batch: &[Transaction]) -> Self {
        if batch.is_empty() {
            return Self {
                count: 0,
                mean: 0.0,
                std_dev: 1.0,
            };
        }

        let n = batch.len() as f64;
        let mean = batch.iter().map(|t| t.amount.to_f64()).sum::<f64>() / n;
        let variance = batch
            .iter()
            .map(|t| {
                let d = t.amount.to_f64() - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();

        Self {
            count: batch.len(),
            mean,
            std_dev: if std_dev > 0.0 && std_dev.is_finite() { std_dev } else { 1.0 },
        }
    }

    /// Distance of an amount from the mean in standard deviations
    pub fn z_score(&self, amount: f64) -> f64 {
        (amount - self.mean).abs() / self.std_dev
    }
}

/// Detector output for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    /// Storage id of the transaction
    pub id: String,
    pub risk_flag: RiskFlag,
    /// z magnitude (or ceiling floor) rounded to 2 decimals
    pub anomaly_score: f64,
}

impl AnomalyVerdict {
    /// Whether persisting this verdict would change the stored record
    pub fn differs_from(&self, tx: &Transaction) -> bool {
        tx.risk_flag != self.risk_flag || tx.anomaly_score != self.anomaly_score
    }
}

/// Statistical outlier detector
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Classify one transaction against precomputed statistics.
    ///
    /// Precedence: absolute ceiling, then z thresholds, then the large
    /// withdrawal bump.
    pub fn classify(&self, tx: &Transaction, stats: &BatchStatistics) -> AnomalyVerdict {
        let cfg = &self.config;
        let amount = tx.amount.value();
        let z = stats.z_score(tx.amount.to_f64());

        let (risk_flag, score) = if amount > cfg.high_value_ceiling {
            (RiskFlag::High, z.max(cfg.ceiling_score_floor))
        } else if z > cfg.high_z {
            (RiskFlag::High, z)
        } else if z > cfg.medium_z {
            (RiskFlag::Medium, z)
        } else if z > cfg.low_z {
            (RiskFlag::Low, z)
        } else if tx.tx_type == TransactionType::Withdrawal && amount > cfg.large_withdrawal_ceiling {
            (RiskFlag::Low, z)
        } else {
            (RiskFlag::None, z)
        };

        AnomalyVerdict {
            id: tx.id.clone(),
            risk_flag,
            anomaly_score: round2(score),
        }
    }

    /// Flag every transaction of the batch, preserving order
    pub fn detect(&self, batch: &[Transaction]) -> Vec<AnomalyVerdict> {
        let stats = BatchStatistics::compute(batch);
        debug!(count = stats.count, mean = stats.mean, std_dev = stats.std_dev, "batch statistics");

        batch.par_iter().map(|tx| self.classify(tx, &stats)).collect()
    }

    /// Copy of the batch with `risk_flag` and `anomaly_score` set from detection
    pub fn annotate(&self, batch: &[Transaction]) -> Vec<Transaction> {
        batch
            .iter()
            .zip(self.detect(batch))
            .map(|(tx, verdict)| {
                let mut annotated = tx.clone();
                annotated.risk_flag = verdict.risk_flag;
                annotated.anomaly_score = verdict.anomaly_score;
                annotated
            })
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskwatch_core::Amount;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tx(id: &str, amount: Decimal, tx_type: TransactionType) -> Transaction {
        Transaction::new(id, Amount::new(amount).unwrap(), tx_type, "user-1").with_id(id)
    }

    fn deposits(amounts: &[Decimal]) -> Vec<Transaction> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| tx(&format!("t{i}"), *a, TransactionType::Deposit))
            .collect()
    }

    #[test]
    fn test_statistics() {
        let stats = BatchStatistics::compute(&deposits(&[dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9)]));

        assert_eq!(stats.count, 8);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
    }

    #[test]
    fn test_degenerate_batch_uses_unit_sigma() {
        let batch = deposits(&[dec!(5000), dec!(5000), dec!(5000)]);
        let stats = BatchStatistics::compute(&batch);
        assert_eq!(stats.std_dev, 1.0);

        let verdicts = AnomalyDetector::default().detect(&batch);
        assert!(verdicts.iter().all(|v| v.risk_flag == RiskFlag::None));
        assert!(verdicts.iter().all(|v| v.anomaly_score == 0.0));
    }

    #[test]
    fn test_single_transaction_over_ceiling() {
        let batch = deposits(&[dec!(750000)]);
        let verdicts = AnomalyDetector::default().detect(&batch);

        // z = 0, so the ceiling floor applies
        assert_eq!(verdicts[0].risk_flag, RiskFlag::High);
        assert_eq!(verdicts[0].anomaly_score, 0.9);
    }

    #[test]
    fn test_ceiling_is_strict() {
        let batch = deposits(&[dec!(500000)]);
        let verdicts = AnomalyDetector::default().detect(&batch);
        assert_eq!(verdicts[0].risk_flag, RiskFlag::None);
    }

    #[test]
    fn test_outlier_among_small_amounts() {
        let mut amounts = vec![
            dec!(9800),
            dec!(10000),
            dec!(10200),
            dec!(9900),
            dec!(10100),
            dec!(9950),
            dec!(10050),
            dec!(10000),
            dec!(9990),
        ];
        amounts.push(dec!(600000));
        let batch = deposits(&amounts);

        let verdicts = AnomalyDetector::default().detect(&batch);
        assert_eq!(verdicts.len(), 10);
        assert_eq!(verdicts[9].id, "t9");
        assert_eq!(verdicts[9].risk_flag, RiskFlag::High);
        assert_eq!(verdicts[9].anomaly_score, 3.0);
        for verdict in &verdicts[..9] {
            assert_eq!(verdict.risk_flag, RiskFlag::None);
            assert!(verdict.anomaly_score < 1.0);
        }
    }

    #[test]
    fn test_z_buckets() {
        // mean 0-ish population with known sigma: amounts 0 x8, 10 x2
        // mean 2, sigma 4 -> z(10) = 2.0 (medium), z(0) = 0.5
        let batch = deposits(&[
            dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0), dec!(10), dec!(10),
        ]);
        let verdicts = AnomalyDetector::default().detect(&batch);

        assert_eq!(verdicts[8].risk_flag, RiskFlag::Medium);
        assert_eq!(verdicts[8].anomaly_score, 2.0);
        assert_eq!(verdicts[0].risk_flag, RiskFlag::None);
        assert_eq!(verdicts[0].anomaly_score, 0.5);
    }

    #[test]
    fn test_large_withdrawal_bump() {
        let batch = vec![
            tx("w", dec!(150000), TransactionType::Withdrawal),
            tx("d", dec!(150000), TransactionType::Deposit),
        ];
        let verdicts = AnomalyDetector::default().detect(&batch);

        assert_eq!(verdicts[0].risk_flag, RiskFlag::Low);
        assert_eq!(verdicts[1].risk_flag, RiskFlag::None);
    }

    #[test]
    fn test_annotate_and_diff() {
        let batch = deposits(&[dec!(1000), dec!(1000), dec!(900000)]);
        let detector = AnomalyDetector::default();
        let annotated = detector.annotate(&batch);

        assert_eq!(annotated[2].risk_flag, RiskFlag::High);
        assert!(detector.detect(&batch)[2].differs_from(&batch[2]));

        let again = detector.detect(&annotated);
        assert!(again.iter().zip(&annotated).all(|(v, t)| !v.differs_from(t)));
    }

    #[test]
    fn test_empty_batch() {
        assert!(AnomalyDetector::default().detect(&[]).is_empty());
    }
}
