//! CLI commands

use std::path::Path;

use riskwatch_compliance::analyzer::format_inr;
use riskwatch_compliance::RiskAnalysisResult;
use riskwatch_core::{RiskFlag, Transaction};
use riskwatch_review::{AlertFilter, KycAction, ReviewAction, SortOrder, TransactionFilter};

use crate::context::AppContext;

fn print_analysis(result: &RiskAnalysisResult) {
    println!(
        "{}  level={} score={} review={}",
        result.transaction_id, result.risk_level, result.risk_score, result.requires_review
    );
    for finding in &result.findings {
        println!("   [{}] {}", finding.rule, finding.message);
    }
}

fn print_transaction(tx: &Transaction) {
    println!(
        "{:<20} {:<10} ₹{:>14} {:<10} flag={:<6} score={:.2} {}",
        tx.reference(),
        tx.tx_type,
        format_inr(tx.amount.value()),
        tx.status,
        tx.risk_flag,
        tx.anomaly_score,
        tx.created_by
    );
}

/// Rule analysis of one stored transaction, or of the most recent batch
pub async fn analyze(ctx: &AppContext, id: Option<&str>) -> anyhow::Result<()> {
    if let Some(id) = id {
        let result = ctx.service.analyze_stored(id).await?;
        print_analysis(&result);
        return Ok(());
    }

    let limit = ctx.service.workflow().config().batch_limit;
    let batch = ctx
        .service
        .list_transactions(&TransactionFilter::new(), SortOrder::NewestFirst, Some(limit))
        .await?;
    let verdicts = ctx.service.engine().evaluate_batch(&batch);

    let mut with_findings = 0;
    for verdict in verdicts.iter().filter(|v| v.has_findings()) {
        print_analysis(&verdict.analysis);
        with_findings += 1;
    }
    println!("✅ Analyzed {} transactions, {} with findings", verdicts.len(), with_findings);
    Ok(())
}

/// Detector flags for the most recent batch (read-only)
pub async fn detect(ctx: &AppContext, limit: usize) -> anyhow::Result<()> {
    let batch = ctx
        .service
        .list_transactions(&TransactionFilter::new(), SortOrder::NewestFirst, Some(limit))
        .await?;
    let annotated = ctx.service.detect_anomalies(&batch)?;

    let raised: Vec<&Transaction> = annotated.iter().filter(|t| t.risk_flag.is_raised()).collect();
    for tx in &raised {
        print_transaction(tx);
    }
    println!("✅ {} of {} transactions stand out", raised.len(), annotated.len());
    Ok(())
}

/// User risk summaries, for one user or every profile
pub async fn summarize(ctx: &AppContext, user: Option<&str>) -> anyhow::Result<()> {
    let users: Vec<String> = match user {
        Some(user) => vec![user.to_string()],
        None => ctx
            .service
            .list_profiles()
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect(),
    };

    for user in &users {
        let summary = ctx.service.user_risk(user).await?;
        println!(
            "{}  level={} score={} high_risk={}",
            user, summary.level, summary.score, summary.high_risk_count
        );
        for factor in &summary.factors {
            println!("   - {}", factor);
        }
    }
    Ok(())
}

/// Batch monitor pass; persists the dataset
pub async fn monitor(ctx: &AppContext) -> anyhow::Result<()> {
    let report = ctx.service.run_monitor().await?;
    ctx.save().await?;

    if report.skipped {
        println!("✅ Transaction set unchanged, nothing to evaluate");
    } else {
        println!(
            "✅ Evaluated {} transactions: {} updated, {} alerts",
            report.evaluated, report.updated, report.alerts
        );
        if report.conflicts > 0 {
            println!("⚠️  {} records changed concurrently and will be retried", report.conflicts);
        }
    }
    Ok(())
}

/// Analyst action on a transaction; persists the dataset
pub async fn review(ctx: &AppContext, id: &str, action: &str, severity: Option<&str>) -> anyhow::Result<()> {
    let action = ReviewAction::parse(action, severity)?;
    let updated = ctx.service.apply_review_action(id, action).await?;
    ctx.save().await?;

    println!("✅ {} {}", action.name(), updated.reference());
    print_transaction(&updated);
    Ok(())
}

/// Analyst KYC decision; persists the dataset
pub async fn kyc(ctx: &AppContext, user: &str, action: &str) -> anyhow::Result<()> {
    let action = KycAction::parse(action)?;
    let profile = ctx.service.update_kyc(user, action).await?;
    ctx.save().await?;

    println!("✅ KYC for {} is now {}", profile.user_id, profile.kyc_status);
    Ok(())
}

pub async fn list_alerts(ctx: &AppContext, filter: &AlertFilter) -> anyhow::Result<()> {
    let alerts = ctx.service.alerts().list(filter).await?;
    for alert in &alerts {
        let marker = if alert.is_read { " " } else { "*" };
        println!(
            "{} {} [{}/{}] {}: {}",
            marker, alert.id, alert.category, alert.alert_type, alert.title, alert.message
        );
    }
    println!("✅ {} alerts", alerts.len());
    Ok(())
}

pub async fn read_alert(ctx: &AppContext, id: &str) -> anyhow::Result<()> {
    ctx.service.alerts().mark_read(id).await?;
    ctx.save().await?;
    println!("✅ Marked {} as read", id);
    Ok(())
}

pub async fn read_all_alerts(ctx: &AppContext) -> anyhow::Result<()> {
    let changed = ctx.service.alerts().mark_all_read().await?;
    ctx.save().await?;
    println!("✅ Marked {} alerts as read", changed);
    Ok(())
}

pub async fn delete_alert(ctx: &AppContext, id: &str) -> anyhow::Result<()> {
    ctx.service.alerts().delete(id).await?;
    ctx.save().await?;
    println!("✅ Deleted alert {}", id);
    Ok(())
}

/// Compliance report alert; persists the dataset
pub async fn report(ctx: &AppContext) -> anyhow::Result<()> {
    let alert = ctx.service.generate_report().await?;
    ctx.save().await?;
    println!("✅ {}", alert.message);
    Ok(())
}

pub async fn overview(ctx: &AppContext) -> anyhow::Result<()> {
    let overview = ctx.service.overview().await?;
    println!("Transactions:      {}", overview.total_transactions);
    println!("Flagged:           {}", overview.flagged_transactions);
    println!("Unread alerts:     {}", overview.unread_alerts);
    println!("Pending KYC:       {}", overview.pending_kyc);
    println!("High-risk users:   {}", overview.high_risk_users);
    Ok(())
}

/// Filtered transaction listing
pub async fn transactions(
    ctx: &AppContext,
    filter: &TransactionFilter,
    order: SortOrder,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let txs = ctx.service.list_transactions(filter, order, limit).await?;
    for tx in &txs {
        print_transaction(tx);
    }
    let flagged = txs.iter().filter(|t| t.risk_flag != RiskFlag::None).count();
    println!("✅ {} transactions, {} flagged", txs.len(), flagged);
    Ok(())
}

/// Bulk insert from a JSON array file; persists the dataset
pub async fn import(ctx: &AppContext, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)?;
    let txs = Transaction::list_from_json(&text)?;
    let count = ctx.service.insert_transactions(txs).await?;
    ctx.save().await?;
    println!("✅ Imported {} transactions from {}", count, file.display());
    Ok(())
}
