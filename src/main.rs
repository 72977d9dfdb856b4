use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

mod db;
mod models;
mod report;
mod scoring;
mod tracker;

use models::EventType;
use tracker::{EventMetadata, RecordOutcome};

#[derive(Parser)]
#[command(name = "outreach-engagement")]
#[command(about = "Report engagement tracker and CRM lead scoring for cold outreach", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed prospects and engagement history
    Seed,
    /// Record one engagement event from a prospect's report page
    Record {
        #[arg(long)]
        prospect: Uuid,
        /// Resolved caller identity; omit to simulate an anonymous viewer
        #[arg(long)]
        user: Option<Uuid>,
        #[arg(long, value_enum)]
        event: EventType,
        /// Fraction of the page scrolled, 0..1
        #[arg(long)]
        scroll_depth: Option<f64>,
        /// Seconds the viewer has stayed on the page
        #[arg(long)]
        dwell_seconds: Option<f64>,
    },
    /// Replay telemetry rows from a CSV file through the record pipeline
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        user: Uuid,
    },
    /// Show a prospect's derived CRM fields
    Status {
        #[arg(long)]
        prospect: Uuid,
        #[arg(long)]
        user: Uuid,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate a markdown engagement report for one owner
    Report {
        #[arg(long)]
        user: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let owner_id = seed_with_history(&pool).await?;
            println!("Seed data inserted for owner {owner_id}.");
        }
        Commands::Record {
            prospect,
            user,
            event,
            scroll_depth,
            dwell_seconds,
        } => {
            let metadata = EventMetadata {
                scroll_depth,
                dwell_seconds,
            };
            // Telemetry is best-effort: a storage failure is logged for
            // operators but never fails the ping.
            match tracker::record_engagement_event(&pool, prospect, user, event, metadata).await {
                Ok(RecordOutcome::Recorded {
                    crm_status,
                    visit_count,
                    ..
                }) => {
                    println!("Recorded. Status {crm_status}, visit count {visit_count}.");
                }
                Ok(RecordOutcome::Skipped(_)) => {
                    println!("Nothing recorded.");
                }
                Err(err) => {
                    log::error!("engagement event not recorded: {err:#}");
                    println!("Nothing recorded.");
                }
            }
        }
        Commands::Import { csv, user } => {
            let (recorded, skipped) = import_csv(&pool, &csv, user).await?;
            println!(
                "Imported {recorded} events from {} ({skipped} skipped).",
                csv.display()
            );
        }
        Commands::Status {
            prospect,
            user,
            json,
        } => {
            let record = db::get_prospect(&pool, prospect).await?;
            let record = match record.filter(|record| record.owner_id == user) {
                Some(record) => record,
                None => {
                    println!("Prospect not found.");
                    return Ok(());
                }
            };

            if json {
                let value = serde_json::json!({
                    "id": record.id,
                    "company_name": record.company_name,
                    "crm_status": record.crm_status,
                    "visit_count": record.visit_count,
                    "last_viewed_at": record.last_viewed_at,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "{}: status {}, {} visits, last viewed {}",
                    record.company_name,
                    record.crm_status,
                    record.visit_count,
                    record
                        .last_viewed_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }
        Commands::Report { user, out } => {
            let overviews = db::fetch_owner_overview(&pool, user).await?;
            let events = db::fetch_recent_events(&pool, user, 10).await?;
            let report = report::build_report(&overviews, &events);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Seed prospects, then replay a small engagement history through the real
/// record pipeline so the derived fields are consistent with the event log.
async fn seed_with_history(pool: &PgPool) -> anyhow::Result<Uuid> {
    let owner_id = db::seed(pool).await?;

    let history = vec![
        // Acme reads the whole report and lingers: hot.
        (
            "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            EventType::Scroll80,
            Some(0.85),
            Some(35.0),
        ),
        // Brightline skims halfway: warm.
        (
            "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc",
            EventType::Scroll50,
            Some(0.55),
            Some(12.0),
        ),
        // Harbor & Vine bounces: cold.
        (
            "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2",
            EventType::View,
            Some(0.2),
            Some(3.0),
        ),
    ];

    for (prospect_id, event, scroll_depth, dwell_seconds) in history {
        let prospect_id = Uuid::parse_str(prospect_id)?;
        let metadata = EventMetadata {
            scroll_depth,
            dwell_seconds,
        };
        tracker::record_engagement_event(pool, prospect_id, Some(owner_id), event, metadata)
            .await?;
    }

    Ok(owner_id)
}

async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    user: Uuid,
) -> anyhow::Result<(usize, usize)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        prospect_id: Uuid,
        event_type: EventType,
        scroll_depth: Option<f64>,
        dwell_seconds: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut recorded = 0usize;
    let mut skipped = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let metadata = EventMetadata {
            scroll_depth: row.scroll_depth,
            dwell_seconds: row.dwell_seconds,
        };
        let outcome = tracker::record_engagement_event(
            pool,
            row.prospect_id,
            Some(user),
            row.event_type,
            metadata,
        )
        .await?;

        match outcome {
            RecordOutcome::Recorded { .. } => recorded += 1,
            RecordOutcome::Skipped(_) => skipped += 1,
        }
    }

    Ok((recorded, skipped))
}
