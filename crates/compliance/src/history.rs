//! Recent-history window selection
//!
//! A transaction's history is the owner's other transactions whose
//! `created_date` lies within `lookback_days` of it (either side), capped at
//! the `max_history` most recent.

use riskwatch_core::Transaction;

use crate::config::HistoryConfig;

/// Select the history slice for `tx` out of `all`
pub fn recent_history<'a>(
    all: &'a [Transaction],
    tx: &Transaction,
    config: &HistoryConfig,
) -> Vec<&'a Transaction> {
    let window = config.lookback();

    let mut history: Vec<&Transaction> = all
        .iter()
        .filter(|other| other.id != tx.id)
        .filter(|other| other.created_by == tx.created_by)
        .filter(|other| {
            let delta = other.created_date - tx.created_date;
            delta.abs() <= window
        })
        .collect();

    // Most recent first, id as tie-breaker keeps the slice deterministic
    history.sort_by(|a, b| {
        b.created_date
            .cmp(&a.created_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    history.truncate(config.max_history);
    history
}
