//! # Outbox Inspector
//!
//! Command-line view of the durable queue and primary datastore health, for
//! operators reconciling records by hand.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sentinel_outbox::clock::SystemClock;
use sentinel_outbox::config::ConfigManager;
use sentinel_outbox::constants::record_types;
use sentinel_outbox::database::DatabaseConnection;
use sentinel_outbox::health::{HealthMonitor, PostgresProbe};
use sentinel_outbox::logging::init_structured_logging;
use sentinel_outbox::queue::DurableQueue;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "outbox-inspect")]
#[command(about = "Inspect the store-and-forward outbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (default: config/outbox.toml or OUTBOX_CONFIG_PATH)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unsynced record counts per type and datastore availability
    Status,
    /// Probe the primary datastore now, ignoring any cached result
    Check,
    /// Unsynced record handles of one type, oldest first
    List {
        /// Record type tag, e.g. message
        record_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_path(path),
        None => ConfigManager::load(),
    }
    .context("loading outbox configuration")?;
    let config = manager.config();

    let health = HealthMonitor::new(
        Arc::new(PostgresProbe::new(DatabaseConnection::new(
            config.database.clone(),
        ))),
        Arc::new(SystemClock),
        config.health.clone(),
    );
    let queue = DurableQueue::open(&config.storage.root_dir)
        .await
        .with_context(|| format!("opening queue at {}", config.storage.root_dir.display()))?;

    match cli.command {
        Commands::Status => {
            for record_type in record_types::ALL {
                let count = queue.unsynced_count(record_type).await?;
                println!("{record_type:<16} {count}");
            }
            println!("database_available {}", health.is_available().await);
        }
        Commands::Check => {
            let available = health.check_fresh().await;
            println!("database_available {available}");
            if !available {
                std::process::exit(1);
            }
        }
        Commands::List { record_type } => {
            for handle in queue.list_unsynced(&record_type).await? {
                match queue.read(&handle).await {
                    Some(record) => println!("{}  {}", record.metadata.queued_at, handle),
                    None => println!("{:<19}  {}", "?", handle),
                }
            }
        }
    }

    Ok(())
}
