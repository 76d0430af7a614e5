//! OTX Ingest - sync subscribed pulses into PostgreSQL

use anyhow::{Context, Result};
use clap::Parser;
use otx_common::logging::{init_logging, LogConfig, LogLevel};
use otx_ingest::config::{SyncConfig, DEFAULT_MAX_PAGES};
use otx_ingest::db;
use otx_ingest::fetcher::OtxClient;
use otx_ingest::sink::PulseSink;
use otx_ingest::store::PgPulseStore;
use otx_ingest::sync::{PulseSync, SyncOptions};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "otx-ingest")]
#[command(author, version, about = "Sync subscribed OTX pulses into PostgreSQL")]
struct Cli {
    /// Maximum number of pages to fetch (0 = follow the feed to its end)
    #[arg(long, env = "OTX_MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loads .env too, so it must run before the LOG_* overrides are read
    let config = SyncConfig::load().context("Invalid configuration")?;

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("otx-ingest")
        .filter_directives("sqlx=warn,hyper=info,reqwest=info")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let pool = match db::connect(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Could not connect to database");
            return Err(e).context("Database unavailable at startup");
        },
    };
    info!("Connected to database");

    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let client = OtxClient::new(&config.api, config.retry.clone())?;
    let sink = PulseSink::new(PgPulseStore::new(pool));
    let options = SyncOptions::new(cli.max_pages, config.page_delay);
    let sync = PulseSync::new(client, sink, options);

    let summary = sync.run(&config.api.subscribed_pulses_url()).await;

    info!(
        pages = summary.pages,
        written = summary.records_written,
        skipped = summary.records_skipped,
        stop_reason = %summary.stop_reason,
        "Sync completed"
    );

    Ok(())
}
