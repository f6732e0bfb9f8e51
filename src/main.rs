use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use fast_accounts::{
    format_localized, import_entries, keep_alive, load_entries, probe, watch, AccountsService,
    AppConfig, EntryForm, FinancialRecord, RawAmount, RecordId, SummaryPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "fast-accounts", version, about = "Track recurring and one-off expenses")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a new record (amount in 1.585,43 format)
    Add {
        service: String,
        amount: String,

        #[arg(long, default_value = "BRL")]
        currency: String,

        /// Falls back to ACCOUNTS_DEFAULT_USERNAME
        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        note: Option<String>,

        /// Monthly, Yearly or One-time
        #[arg(long, default_value = "Monthly")]
        billing: String,
    },

    /// List records, optionally filtered locally
    List {
        #[arg(long)]
        filter: Option<String>,
    },

    /// Search service and description on the store
    Search { query: String },

    /// Monthly / annual totals per currency
    Summary {
        /// flag or date (defaults to ACCOUNTS_SUMMARY_POLICY)
        #[arg(long)]
        policy: Option<SummaryPolicy>,
    },

    /// Delete every record with this service name
    Delete { service: String },

    /// Delete one record by id
    DeleteId { id: String },

    /// Import records from a CSV file
    Import { csv: PathBuf },

    /// One minimal read to keep the backend awake
    KeepAlive,

    /// Show connectivity; --watch keeps probing
    Status {
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Missing connection settings abort here
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let store = config.open_store().context("Failed to open record store")?;
    let service = AccountsService::new(Arc::clone(&store), config.engine.clone());

    match cli.command {
        Command::Add {
            service: name,
            amount,
            currency,
            user,
            note,
            billing,
        } => {
            let entry = EntryForm {
                service: name,
                username: user,
                amount: Some(RawAmount::Text(amount)),
                currency: Some(currency),
                description: note,
                recurring: None,
                billing: Some(billing),
            };
            let stored = service.save_entry(entry).await?;
            println!("✅ {} saved", stored.service);
            print_records(&[stored]);
        }

        Command::List { filter } => {
            let records = service.filter(filter.as_deref().unwrap_or("")).await?;
            println!("📊 {} records", records.len());
            print_records(&records);
        }

        Command::Search { query } => {
            let records = service.search(&query).await?;
            println!("🔍 {} matches for {:?}", records.len(), query);
            print_records(&records);
        }

        Command::Summary { policy } => {
            let policy = policy.unwrap_or(config.engine.policy);
            let summary = service.financial_summary_with(policy).await?;

            println!("📊 Summary ({} policy)", policy.name());
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for (currency, totals) in summary.iter() {
                println!(
                    "{:<4} monthly {:>4} {:>14}   annual {:>4} {:>14}",
                    currency.code(),
                    currency.symbol(),
                    format_localized(totals.monthly),
                    currency.symbol(),
                    format_localized(totals.annual),
                );
            }
        }

        Command::Delete { service: name } => {
            let removed = service.delete_service(&name).await?;
            println!("🗑️  Deleted {} record(s) named {:?}", removed, name);
        }

        Command::DeleteId { id } => {
            if service.delete_record(&RecordId::from(id.as_str())).await? {
                println!("🗑️  Deleted record {}", id);
            } else {
                println!("⚠️  No record with id {}", id);
            }
        }

        Command::Import { csv } => {
            println!("📂 Loading CSV...");
            let entries = load_entries(&csv)?;
            println!("✓ Loaded {} rows from {:?}", entries.len(), csv);

            let report = import_entries(&service, entries).await;
            println!("✓ Saved: {}", report.saved);
            println!("✓ Rejected: {}", report.rejected.len());
            for (line, reason) in &report.rejected {
                println!("   line {}: {}", line, reason);
            }
        }

        Command::KeepAlive => {
            keep_alive(store.as_ref())
                .await
                .context("Keep-alive ping failed")?;
            println!("✅ Backend poked at {}", chrono::Local::now());
        }

        Command::Status { watch: keep_watching } => {
            if keep_watching {
                watch(store.as_ref(), config.probe_interval, |status| {
                    println!("{} {}", if status.is_online() { "🟢" } else { "🔴" }, status.label());
                    true
                })
                .await;
            } else {
                let status = probe(store.as_ref()).await;
                println!("{} {}", if status.is_online() { "🟢" } else { "🔴" }, status.label());
            }
        }
    }

    Ok(())
}

fn print_records(records: &[FinancialRecord]) {
    for record in records {
        println!(
            "{:<24} {:<12} {:>4} {:>12}  {:<9} {}  {}",
            record.service,
            record.username,
            record.currency.symbol(),
            format_localized(record.amount),
            if record.is_recurring { "recurring" } else { "one-off" },
            record.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            record.id,
        );
        if !record.description.is_empty() {
            println!("    {}", record.description);
        }
    }
}
