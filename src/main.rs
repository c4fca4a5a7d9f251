//! garantias - Warranty ticket automation CLI
//!
//! # Usage
//!
//! ```bash
//! # Process a form submission (webhook payload written to disk by the
//! # workflow that received it)
//! garantias intake --webhook payload.json
//!
//! # Daily scheduled run: detect status changes and email clients
//! garantias status-sync
//!
//! # Out-of-band staff edit (replaces the old spreadsheet edit)
//! garantias set-status --ticket <uuid> --status Tramitada
//!
//! # Inspect the tracking state
//! garantias summary
//! ```
//!
//! # Environment Variables
//!
//! - `GARANTIAS_CONFIG`: path to the TOML config file
//! - `GARANTIAS_SMTP_HOST` / `_PORT` / `_USERNAME` / `_PASSWORD`: SMTP
//!   credentials (override the config file)
//! - `GARANTIAS_ADMIN_EMAIL`: admin alert/summary recipient
//! - `RUST_LOG`: logging level (default: info)
//!
//! Exit codes: 0 success, 1 fatal error, 2 duplicate submission suppressed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use garantias::config::Settings;
use garantias::intake::{self, IntakeOutcome};
use garantias::notify::SmtpNotifier;
use garantias::status;
use garantias::store::{JsonSnapshotStore, SledRecordStore, SnapshotStore};
use garantias::types::TicketStatus;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "garantias")]
#[command(about = "Warranty ticket intake and status notification automation")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file (default: $GARANTIAS_CONFIG, then
    /// ./garantias.toml, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Process one warranty form submission
    Intake {
        /// Path to the webhook payload JSON file
        #[arg(long, value_name = "FILE")]
        webhook: PathBuf,
    },

    /// Detect status changes and send client notifications
    StatusSync,

    /// Move a ticket to a new status (staff edit, read by the next sync)
    SetStatus {
        /// Ticket id
        #[arg(long)]
        ticket: String,
        /// New status: Recibida, Tramitada, Aceptada or Denegada
        #[arg(long)]
        status: String,
    },

    /// Print record and tracking counts
    Summary,
}

// ============================================================================
// Subcommand Implementations
// ============================================================================

async fn run_intake(settings: &Settings, webhook: &PathBuf) -> Result<ExitCode> {
    let text = std::fs::read_to_string(webhook)
        .with_context(|| format!("reading webhook payload {}", webhook.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing webhook payload {}", webhook.display()))?;

    let records = SledRecordStore::open(&settings.storage.data_dir)?;
    let notifier = SmtpNotifier::from_config(&settings.smtp, &settings.company)?;

    let report =
        intake::process_submission(&payload, &records, &notifier, &settings.dedup).await?;

    match report.outcome {
        IntakeOutcome::Created { ticket_id } => {
            info!(
                ticket_id = %ticket_id,
                confirmation = report.confirmation_sent,
                admin = report.admin_notified,
                "Intake complete"
            );
            Ok(ExitCode::SUCCESS)
        }
        IntakeOutcome::SuppressedDuplicate { ticket_id, score } => {
            warn!(
                duplicate_of = %ticket_id,
                score = %format!("{score:.3}"),
                "Intake stopped: duplicate submission"
            );
            Ok(ExitCode::from(2))
        }
    }
}

async fn run_status_sync(settings: &Settings) -> Result<ExitCode> {
    let records = SledRecordStore::open(&settings.storage.data_dir)?;
    let snapshots = JsonSnapshotStore::new(settings.storage.snapshot_path.clone());
    let notifier = SmtpNotifier::from_config(&settings.smtp, &settings.company)?;

    let summary = status::run_status_sync(
        &records,
        &snapshots,
        &notifier,
        &settings.tracking,
        Utc::now(),
    )
    .await?;

    if summary.failed > 0 {
        warn!(
            failed = summary.failed,
            "Run finished with failed notifications, see log for ticket ids"
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_set_status(settings: &Settings, ticket: &str, status: &str) -> Result<ExitCode> {
    let status = TicketStatus::parse(status)
        .with_context(|| format!("unknown status `{status}` (expected Recibida, Tramitada, Aceptada or Denegada)"))?;

    let records = SledRecordStore::open(&settings.storage.data_dir)?;
    let updated = records.set_status(ticket, status)?;
    info!(
        ticket_id = %updated.ticket_id,
        brand = %updated.brand,
        status = %updated.status,
        "Ticket status updated"
    );
    Ok(ExitCode::SUCCESS)
}

fn run_summary(settings: &Settings) -> Result<ExitCode> {
    use garantias::store::RecordStore;

    let records = SledRecordStore::open(&settings.storage.data_dir)?;
    let snapshots = JsonSnapshotStore::new(settings.storage.snapshot_path.clone());

    let all = records.list_records(None)?;
    let snapshot = snapshots.load()?;

    let mut by_status: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_brand: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &all {
        *by_status.entry(record.status.as_str()).or_default() += 1;
        *by_brand.entry(record.brand.partition_name()).or_default() += 1;
    }

    println!("Records: {}", all.len());
    for (status, count) in &by_status {
        println!("  {status}: {count}");
    }
    println!("Brands:");
    for (brand, count) in &by_brand {
        println!("  {brand}: {count}");
    }
    println!("Tracked tickets (snapshot): {}", snapshot.len());
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Settings::load(),
    };

    match &args.command {
        SubCommand::Intake { webhook } => run_intake(&settings, webhook).await,
        SubCommand::StatusSync => run_status_sync(&settings).await,
        SubCommand::SetStatus { ticket, status } => run_set_status(&settings, ticket, status),
        SubCommand::Summary => run_summary(&settings),
    }
}
