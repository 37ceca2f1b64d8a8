//! CLI for driving the content refresh pipeline by hand.
//!
//! Every command prints a single JSON document so the output can be piped
//! into other tooling. Uses the same configuration as the server.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::PgPool;

use refresh_core::common::RecordId;
use refresh_core::config::Config;
use refresh_core::domains::refresh::{
    run_batch, run_refresh_cycle, sweep, CooldownState, PostgresRecordStore, RecordStore,
    RefreshableRecord,
};
use refresh_core::server::build_deps;

#[derive(Parser)]
#[command(name = "refresh_cli")]
#[command(about = "Content refresh pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flag every record whose cooldown has elapsed
    Sweep,

    /// Regenerate content for flagged records
    Run {
        /// Maximum records to process (defaults to REFRESH_BATCH_LIMIT)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Sweep, then regenerate, within the configured cycle timeout
    Cycle {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Register an edit, restarting the record's cooldown
    Edit { id: RecordId },

    /// Print a record with its cooldown state
    Show { id: RecordId },
}

#[derive(Serialize)]
struct Response<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

fn output<T: Serialize>(resp: Response<T>) -> Result<()> {
    println!("{}", serde_json::to_string(&resp)?);
    Ok(())
}

fn success<T: Serialize>(data: T) -> Result<()> {
    output(Response {
        success: true,
        message: None,
        data: Some(data),
    })
}

fn failure(message: impl Into<String>) -> Result<()> {
    output::<()>(Response {
        success: false,
        message: Some(message.into()),
        data: None,
    })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,refresh_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = get_pool(&config).await?;

    match cli.command {
        Commands::Sweep => cmd_sweep(&config, pool).await,
        Commands::Run { limit } => cmd_run(&config, pool, limit).await,
        Commands::Cycle { limit } => cmd_cycle(&config, pool, limit).await,
        Commands::Edit { id } => cmd_edit(pool, id).await,
        Commands::Show { id } => cmd_show(&config, pool, id).await,
    }
}

async fn get_pool(config: &Config) -> Result<PgPool> {
    PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_sweep(config: &Config, pool: PgPool) -> Result<()> {
    let store = PostgresRecordStore::new(pool);
    let settings = config.refresh_settings();

    match sweep(&store, settings.cooldown, Utc::now()).await {
        Ok(report) => success(report),
        Err(e) => failure(e.to_string()),
    }
}

async fn cmd_run(config: &Config, pool: PgPool, limit: Option<usize>) -> Result<()> {
    let deps = build_deps(config, pool)?;
    let limit = limit.unwrap_or(deps.settings.batch_limit);

    match run_batch(
        deps.store.as_ref(),
        deps.generator.as_ref(),
        limit,
        &deps.settings.backoff,
        Utc::now(),
    )
    .await
    {
        Ok(summary) => success(summary),
        Err(e) => failure(e.to_string()),
    }
}

async fn cmd_cycle(config: &Config, pool: PgPool, limit: Option<usize>) -> Result<()> {
    let deps = build_deps(config, pool)?;

    match run_refresh_cycle(&deps, limit).await {
        Ok(summary) => success(summary),
        Err(e) => failure(e.to_string()),
    }
}

async fn cmd_edit(pool: PgPool, id: RecordId) -> Result<()> {
    let store = PostgresRecordStore::new(pool);

    if store.record_edit(id, Utc::now()).await? {
        let record = store.find_by_id(id).await?;
        success(record)
    } else {
        failure(format!("Record {} not found", id))
    }
}

#[derive(Serialize)]
struct RecordView {
    record: RefreshableRecord,
    cooldown: CooldownState,
}

async fn cmd_show(config: &Config, pool: PgPool, id: RecordId) -> Result<()> {
    let store = PostgresRecordStore::new(pool);
    let cooldown = config.refresh_settings().cooldown;

    match store.find_by_id(id).await? {
        Some(record) => {
            let state = record.cooldown_state(Utc::now(), cooldown);
            success(RecordView {
                record,
                cooldown: state,
            })
        }
        None => failure(format!("Record {} not found", id)),
    }
}
