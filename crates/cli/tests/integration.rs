//! Integration tests for the riskwatch CLI
//!
//! These tests drive the commands over a dataset directory and check what
//! ends up on disk between runs.

use std::path::Path;

use riskwatch_cli::context::{ALERTS_FILE, LEDGER_FILE, MONITOR_FILE, PROFILES_FILE, TRANSACTIONS_FILE};
use riskwatch_cli::{commands, AppContext};
use riskwatch_core::{Alert, KycStatus, RiskFlag, Transaction, TransactionStatus, UserProfile};
use riskwatch_review::{AlertFilter, ReviewLedger};
use serde_json::json;
use tempfile::TempDir;

fn write_dataset(dir: &Path) {
    let mut txs = Vec::new();
    for i in 0..9 {
        txs.push(json!({
            "id": format!("id-{i}"),
            "transaction_id": format!("TXN{i:04}"),
            "amount": 10000 + i * 100,
            "type": "deposit",
            "category": "Salary",
            "counterparty": "HDFC Bank",
            "created_by": "u1",
            "created_date": format!("2024-06-01T{:02}:00:00Z", i + 1),
        }));
    }
    txs.push(json!({
        "id": "id-9",
        "transaction_id": "TXN0009",
        "amount": "600000",
        "type": "deposit",
        "category": "Salary",
        "counterparty": "HDFC Bank",
        "created_by": "u1",
        "created_date": "2024-06-01T12:00:00Z",
    }));
    let profiles = json!([{ "id": "p1", "user_id": "u1", "full_name": "Asha Rao" }]);

    std::fs::write(dir.join(TRANSACTIONS_FILE), serde_json::to_string(&txs).unwrap()).unwrap();
    std::fs::write(dir.join(PROFILES_FILE), profiles.to_string()).unwrap();
}

fn read_transactions(dir: &Path) -> Vec<Transaction> {
    Transaction::list_from_json(&std::fs::read_to_string(dir.join(TRANSACTIONS_FILE)).unwrap()).unwrap()
}

fn read_alerts(dir: &Path) -> Vec<Alert> {
    Alert::list_from_json(&std::fs::read_to_string(dir.join(ALERTS_FILE)).unwrap()).unwrap()
}

/// Test: monitor → reopen → monitor does not duplicate flags or alerts
#[tokio::test]
async fn test_monitor_persists_and_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();
    write_dataset(data);

    let ctx = AppContext::open(data, None).await.unwrap();
    commands::monitor(&ctx).await.unwrap();
    drop(ctx);

    let txs = read_transactions(data);
    let outlier = txs.iter().find(|t| t.id == "id-9").unwrap();
    assert_eq!(outlier.status, TransactionStatus::Flagged);
    assert_eq!(outlier.risk_flag, RiskFlag::High);
    assert_eq!(txs.iter().filter(|t| t.risk_flag.is_raised()).count(), 1);
    assert_eq!(read_alerts(data).len(), 1);
    assert!(data.join(MONITOR_FILE).exists());

    let ctx = AppContext::open(data, None).await.unwrap();
    let report = ctx.service.run_monitor().await.unwrap();
    assert!(report.skipped);
    commands::monitor(&ctx).await.unwrap();
    assert_eq!(read_alerts(data).len(), 1);

    let profiles = UserProfile::list_from_json(&std::fs::read_to_string(data.join(PROFILES_FILE)).unwrap()).unwrap();
    assert!(profiles[0].risk_score.is_some());
}

/// Test: analyst decisions survive a reopen and land in the ledger file
#[tokio::test]
async fn test_review_and_kyc_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();
    write_dataset(data);

    let ctx = AppContext::open(data, None).await.unwrap();
    commands::monitor(&ctx).await.unwrap();
    commands::review(&ctx, "id-9", "approve", None).await.unwrap();
    commands::kyc(&ctx, "u1", "start").await.unwrap();
    commands::kyc(&ctx, "u1", "verify").await.unwrap();
    drop(ctx);

    let ctx = AppContext::open(data, None).await.unwrap();
    let outlier = ctx
        .service
        .list_transactions(&Default::default(), Default::default(), None)
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.id == "id-9")
        .unwrap();
    assert_eq!(outlier.status, TransactionStatus::Completed);
    assert_eq!(outlier.risk_flag, RiskFlag::None);

    let overview = ctx.service.overview().await.unwrap();
    assert_eq!(overview.pending_kyc, 0);
    assert_eq!(overview.flagged_transactions, 0);
    assert_eq!(overview.total_transactions, 10);

    let profile = ctx.service.list_profiles().await.unwrap().remove(0);
    assert_eq!(profile.kyc_status, KycStatus::Verified);

    let events = ReviewLedger::open(data.join(LEDGER_FILE)).unwrap().read_all().unwrap();
    assert!(events.len() >= 4);
}

/// Test: rejected input leaves the dataset untouched
#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();
    write_dataset(data);

    let ctx = AppContext::open(data, None).await.unwrap();
    assert!(commands::review(&ctx, "id-1", "escalate", None).await.is_err());
    assert!(commands::review(&ctx, "id-1", "flag", None).await.is_err());
    assert!(commands::kyc(&ctx, "u1", "maybe").await.is_err());
    assert!(commands::review(&ctx, "missing", "approve", None).await.is_err());

    let import = data.join("import.json");
    std::fs::write(
        &import,
        json!([{ "id": "bad", "amount": "-5", "type": "deposit", "created_by": "u1", "created_date": "2024-06-02T00:00:00Z" }])
            .to_string(),
    )
    .unwrap();
    assert!(commands::import(&ctx, &import).await.is_err());
    assert_eq!(read_transactions(data).len(), 10);
}

/// Test: importing records that already exist keeps the analyst's decision
#[tokio::test]
async fn test_repeated_import_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();
    write_dataset(data);

    let ctx = AppContext::open(data, None).await.unwrap();
    commands::monitor(&ctx).await.unwrap();
    commands::review(&ctx, "id-9", "decline", None).await.unwrap();

    let import = data.join("import.json");
    std::fs::write(
        &import,
        json!([{ "id": "id-9", "amount": 1, "type": "deposit", "created_by": "u1", "created_date": "2024-06-01T12:00:00Z" }])
            .to_string(),
    )
    .unwrap();
    assert!(commands::import(&ctx, &import).await.is_err());
    drop(ctx);

    let txs = read_transactions(data);
    assert_eq!(txs.len(), 10);
    let declined = txs.iter().find(|t| t.id == "id-9").unwrap();
    assert_eq!(declined.status, TransactionStatus::Failed);
    assert_eq!(declined.risk_flag, RiskFlag::High);
}

#[tokio::test]
async fn test_duplicate_ids_in_dataset_fail_to_open() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();
    let record = json!({ "id": "t1", "amount": 10, "type": "deposit", "created_by": "u1", "created_date": "2024-06-01T00:00:00Z" });
    std::fs::write(data.join(TRANSACTIONS_FILE), json!([record.clone(), record]).to_string()).unwrap();

    assert!(AppContext::open(data, None).await.is_err());
}

#[tokio::test]
async fn test_malformed_dataset_fails_to_open() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();
    std::fs::write(
        data.join(TRANSACTIONS_FILE),
        r#"[{"id": "t1", "amount": 10, "type": "gift", "created_by": "u1", "created_date": "2024-06-01T00:00:00Z"}]"#,
    )
    .unwrap();

    assert!(AppContext::open(data, None).await.is_err());
}

/// Test: import, report and alert management
#[tokio::test]
async fn test_import_report_and_alerts() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();

    let import = data.join("import.json");
    std::fs::write(
        &import,
        json!([
            { "id": "w1", "amount": 250000, "type": "withdrawal", "created_by": "u2", "created_date": "2024-06-02T00:00:00Z" },
            { "id": "d1", "amount": 1000, "type": "deposit", "created_by": "u2", "created_date": "2024-06-03T00:00:00Z" }
        ])
        .to_string(),
    )
    .unwrap();

    let ctx = AppContext::open(data, None).await.unwrap();
    commands::import(&ctx, &import).await.unwrap();
    commands::report(&ctx).await.unwrap();
    assert_eq!(read_transactions(data).len(), 2);

    let alerts = read_alerts(data);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Compliance Report Generated");
    assert!(alerts[0].message.ends_with("0 transactions flagged for review."));

    commands::read_all_alerts(&ctx).await.unwrap();
    let unread = AlertFilter {
        unread_only: true,
        ..Default::default()
    };
    assert!(ctx.service.alerts().list(&unread).await.unwrap().is_empty());

    commands::delete_alert(&ctx, &alerts[0].id).await.unwrap();
    assert!(read_alerts(data).is_empty());
}

#[tokio::test]
async fn test_catalog_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();
    let catalog = data.join("catalog.json");
    std::fs::write(&catalog, r#"{"thresholds": {"cash_limit": "300000"}}"#).unwrap();

    let ctx = AppContext::open(data, Some(&catalog)).await.unwrap();
    assert_eq!(ctx.service.catalog().thresholds.cash_limit.to_string(), "300000");
}
