//! OTX Ingest Library
//!
//! Pulls subscribed threat-intelligence pulses from the AlienVault OTX API and
//! upserts them into PostgreSQL, one page at a time.
//!
//! # Components
//!
//! - [`fetcher`]: one page per call, with 429 waits and a bounded retry budget
//! - [`normalizer`]: raw pulse JSON to [`PulseRecord`](otx_common::types::PulseRecord)
//! - [`sink`]: idempotent, keyed upserts through a [`PulseStore`](store::PulseStore)
//! - [`sync`]: the pagination loop tying them together
//!
//! # Example
//!
//! ```no_run
//! use otx_ingest::config::SyncConfig;
//! use otx_ingest::fetcher::OtxClient;
//! use otx_ingest::sink::PulseSink;
//! use otx_ingest::store::PgPulseStore;
//! use otx_ingest::sync::{PulseSync, SyncOptions};
//! use otx_ingest::db;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::load()?;
//!     let pool = db::connect(&config.database).await?;
//!
//!     let client = OtxClient::new(&config.api, config.retry.clone())?;
//!     let sink = PulseSink::new(PgPulseStore::new(pool));
//!     let sync = PulseSync::new(client, sink, SyncOptions::new(3, config.page_delay));
//!
//!     let summary = sync.run(&config.api.subscribed_pulses_url()).await;
//!     tracing::info!(pages = summary.pages, written = summary.records_written, "Sync done");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod fetcher;
pub mod normalizer;
pub mod sink;
pub mod store;
pub mod sync;
