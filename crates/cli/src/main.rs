//! RiskWatch CLI - Main entry point

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use riskwatch_cli::{commands, AppContext};
use riskwatch_core::{AlertCategory, AlertType, RiskFlag, TransactionStatus, TransactionType};
use riskwatch_review::{AlertFilter, SortOrder, TransactionFilter};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "riskwatch")]
#[command(about = "RiskWatch - AML/KYC transaction risk monitoring", long_about = None)]
struct Cli {
    /// Data directory (transactions.json, profiles.json, alerts.json)
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Rule catalog JSON file (defaults to $RISKWATCH_CATALOG, then built-ins)
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rule analysis of one transaction, or of the most recent batch
    Analyze {
        /// Storage id of the transaction
        id: Option<String>,
    },

    /// Show detector flags for the most recent batch without writing
    Detect {
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Per-user risk summary
    Summarize {
        /// User ID (all profiles when omitted)
        user: Option<String>,
    },

    /// Re-evaluate the most recent transactions and persist changed flags
    Monitor,

    /// Analyst action on a transaction
    Review {
        /// Storage id of the transaction
        id: String,
        /// approve, decline or flag
        action: String,
        /// Severity for `flag` (low, medium, high)
        #[arg(long)]
        severity: Option<String>,
    },

    /// Analyst KYC decision
    Kyc {
        /// User ID
        user: String,
        /// start, verify or reject
        action: String,
    },

    /// Alert management
    Alerts {
        #[command(subcommand)]
        command: AlertCommands,
    },

    /// Generate the compliance report alert
    Report,

    /// Dashboard totals
    Overview,

    /// List transactions
    Transactions {
        /// Substring of transaction reference or counterparty
        #[arg(long)]
        search: Option<String>,
        #[arg(long = "type")]
        tx_type: Option<String>,
        #[arg(long)]
        flag: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        min_amount: Option<Decimal>,
        #[arg(long)]
        max_amount: Option<Decimal>,
        #[arg(long)]
        oldest_first: bool,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Bulk insert transactions from a JSON array file
    Import {
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AlertCommands {
    /// List alerts, newest first
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "type")]
        alert_type: Option<String>,
        #[arg(long)]
        unread: bool,
    },

    /// Mark one alert as read
    Read { id: String },

    /// Mark every alert as read
    ReadAll,

    /// Delete an alert
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (RUST_LOG)
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let ctx = AppContext::open(&cli.data, cli.catalog.as_deref()).await?;

    match cli.command {
        Commands::Analyze { id } => commands::analyze(&ctx, id.as_deref()).await?,

        Commands::Detect { limit } => commands::detect(&ctx, limit).await?,

        Commands::Summarize { user } => commands::summarize(&ctx, user.as_deref()).await?,

        Commands::Monitor => commands::monitor(&ctx).await?,

        Commands::Review { id, action, severity } => {
            commands::review(&ctx, &id, &action, severity.as_deref()).await?;
        }

        Commands::Kyc { user, action } => commands::kyc(&ctx, &user, &action).await?,

        Commands::Alerts { command } => match command {
            AlertCommands::List {
                category,
                alert_type,
                unread,
            } => {
                let filter = AlertFilter {
                    category: category.as_deref().map(AlertCategory::parse).transpose()?,
                    alert_type: alert_type.as_deref().map(AlertType::parse).transpose()?,
                    unread_only: unread,
                };
                commands::list_alerts(&ctx, &filter).await?;
            }
            AlertCommands::Read { id } => commands::read_alert(&ctx, &id).await?,
            AlertCommands::ReadAll => commands::read_all_alerts(&ctx).await?,
            AlertCommands::Delete { id } => commands::delete_alert(&ctx, &id).await?,
        },

        Commands::Report => commands::report(&ctx).await?,

        Commands::Overview => commands::overview(&ctx).await?,

        Commands::Transactions {
            search,
            tx_type,
            flag,
            status,
            user,
            from,
            to,
            min_amount,
            max_amount,
            oldest_first,
            limit,
        } => {
            let mut filter = TransactionFilter::new()
                .between(
                    from.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()),
                    to.and_then(|d| d.and_hms_opt(23, 59, 59)).map(|dt| dt.and_utc()),
                )
                .with_amount_range(min_amount, max_amount);
            if let Some(search) = search {
                filter = filter.with_search(search);
            }
            if let Some(tx_type) = tx_type {
                filter = filter.with_type(TransactionType::parse(&tx_type)?);
            }
            if let Some(flag) = flag {
                filter = filter.with_risk_flag(RiskFlag::parse(&flag)?);
            }
            if let Some(status) = status {
                filter = filter.with_status(TransactionStatus::parse(&status)?);
            }
            if let Some(user) = user {
                filter = filter.with_owner(user);
            }
            let order = if oldest_first {
                SortOrder::OldestFirst
            } else {
                SortOrder::NewestFirst
            };
            commands::transactions(&ctx, &filter, order, limit).await?;
        }

        Commands::Import { file } => commands::import(&ctx, &file).await?,
    }

    Ok(())
}
