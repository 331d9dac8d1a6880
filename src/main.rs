use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod analytics;
mod db;
mod error;
mod extractor;
mod ingest;
mod models;
mod report;
mod store;
mod validator;

use crate::db::PgRecordStore;
use crate::models::FileRecord;
use crate::store::RecordStore;
use crate::validator::Document;

#[derive(Parser)]
#[command(name = "trade-file-ingest")]
#[command(about = "Upload trade XML files and track ingestion analytics", long_about = None)]
struct Cli {
    /// Maximum number of pooled Postgres connections
    #[arg(long, global = true, default_value_t = 5)]
    max_connections: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Validate, parse and store a trade XML file
    Upload {
        #[arg(long)]
        file: PathBuf,
    },
    /// List uploaded files, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one file and its trades
    Show {
        id: Uuid,
        /// Write the file's trades to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an uploaded file
    Delete { id: Uuid },
    /// Print upload statistics
    Stats,
    /// Generate a markdown analytics report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 5)]
        recent: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = PgRecordStore::new(pool.clone());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Upload { file } => {
            let document = Document::from_path(&file)?;
            let outcome = ingest::ingest(&store, &document)
                .await
                .with_context(|| format!("failed to ingest {}", file.display()))?;
            println!(
                "Stored {} as {} ({}) with {} trades.",
                outcome.filename, outcome.id, outcome.status, outcome.trade_count
            );
        }
        Commands::List { limit } => {
            let files = match limit {
                Some(limit) => store.list_recent(limit).await?,
                None => store.list_all().await?,
            };

            if files.is_empty() {
                println!("No files uploaded yet.");
                return Ok(());
            }

            for file in files.iter() {
                println!(
                    "- {} {} ({}, {}, {} trades) uploaded {}",
                    file.id,
                    file.filename,
                    file.file_size,
                    file.status,
                    file.trade_count(),
                    file.uploaded_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Commands::Show { id, csv, json } => {
            let file = store
                .fetch_record(id)
                .await?
                .with_context(|| format!("no file with id {id}"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&file)?);
            } else {
                print_trades(&file);
            }

            if let Some(path) = csv {
                export_trades(&file, &path)?;
                println!("Wrote {} trades to {}.", file.trade_count(), path.display());
            }
        }
        Commands::Delete { id } => {
            store.delete_record(id).await?;
            tracing::info!(%id, "file record deleted");
            println!("Deleted {id}.");
        }
        Commands::Stats => {
            let summary = analytics::summarize(&store.list_all().await?);
            println!("Total files: {}", summary.total_files);
            println!("Success rate: {:.1}%", summary.success_rate);
            println!(
                "Avg process time: {:.2}s (placeholder, not measured)",
                summary.avg_process_time_secs
            );
            println!("Avg file size: {:.1} KB", summary.avg_file_size_kb);

            for group in summary.file_types.iter() {
                println!(
                    "- {}: {} files, avg {:.1} KB, {:.1}% success",
                    group.file_type, group.files, group.avg_size_kb, group.success_rate
                );
            }
        }
        Commands::Report { out, recent } => {
            let files = store.list_all().await?;
            let summary = analytics::summarize(&files);
            let recent_files = &files[..recent.min(files.len())];
            let report = report::build_report(chrono::Utc::now(), &summary, recent_files);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn print_trades(file: &FileRecord) {
    println!("Trades in {} ({}, {}):", file.filename, file.file_size, file.status);

    if file.sample_trades.is_empty() {
        println!("No trades found in this file.");
        return;
    }

    for trade in file.sample_trades.iter() {
        println!(
            "- {} {} {} {} @ {} with {}",
            trade.date.as_deref().unwrap_or("-"),
            trade.symbol.as_deref().unwrap_or("-"),
            trade.trade_type.as_deref().unwrap_or("-"),
            trade.quantity,
            trade.price,
            trade.counterparty.as_deref().unwrap_or("-")
        );
    }
}

fn export_trades(file: &FileRecord, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for trade in file.sample_trades.iter() {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}
