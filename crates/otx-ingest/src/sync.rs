//! Pagination loop: fetch → normalize → upsert → advance
//!
//! Pages are processed strictly one after another. The loop ends when the
//! feed has no `next` cursor, a fetch gives up, a page comes back empty, or
//! the configured page ceiling is reached.

use crate::config::DEFAULT_PAGE_DELAY_SECS;
use crate::fetcher::OtxClient;
use crate::normalizer::normalize;
use crate::sink::PulseSink;
use crate::store::PulseStore;
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

/// Loop tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Stop after this many pages; `None` follows the feed to its end
    pub max_pages: Option<u32>,
    /// Sleep between consecutive page requests
    pub page_delay: Duration,
}

impl SyncOptions {
    /// `max_pages == 0` means no ceiling
    pub fn new(max_pages: u32, page_delay: Duration) -> Self {
        Self {
            max_pages: (max_pages > 0).then_some(max_pages),
            page_delay,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            page_delay: Duration::from_secs(DEFAULT_PAGE_DELAY_SECS),
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no `next` cursor
    Exhausted,
    /// `max_pages` pages were processed
    PageLimit,
    /// A fetch gave up after its retries
    FetchFailed,
    /// The API returned an empty body
    EmptyPage,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "exhausted"),
            StopReason::PageLimit => write!(f, "page_limit"),
            StopReason::FetchFailed => write!(f, "fetch_failed"),
            StopReason::EmptyPage => write!(f, "empty_page"),
        }
    }
}

/// What one run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    /// Pages fetched and processed
    pub pages: u32,
    /// Records reported written by the sink
    pub records_written: usize,
    /// Items dropped by the normalizer
    pub records_skipped: usize,
    pub stop_reason: StopReason,
}

/// Drives the fetcher, normalizer and sink across the paginated feed
pub struct PulseSync<S> {
    client: OtxClient,
    sink: PulseSink<S>,
    options: SyncOptions,
}

impl<S: PulseStore> PulseSync<S> {
    pub fn new(client: OtxClient, sink: PulseSink<S>, options: SyncOptions) -> Self {
        Self {
            client,
            sink,
            options,
        }
    }

    pub fn sink(&self) -> &PulseSink<S> {
        &self.sink
    }

    /// Walk the feed starting at `start_url`
    pub async fn run(&self, start_url: &str) -> SyncSummary {
        let mut url = start_url.to_string();
        let mut pages = 0u32;
        let mut records_written = 0usize;
        let mut records_skipped = 0usize;

        let stop_reason = loop {
            let page_number = pages + 1;
            info!(page = page_number, "Fetching page");

            let payload = match self.client.fetch_page(&url).await {
                Ok(payload) if payload.is_empty() => {
                    error!(page = page_number, "No data fetched, stopping sync");
                    break StopReason::EmptyPage;
                },
                Ok(payload) => payload,
                Err(e) => {
                    error!(page = page_number, error = %e, "No data fetched, stopping sync");
                    break StopReason::FetchFailed;
                },
            };
            pages = page_number;

            let page = normalize(&payload);
            records_skipped += page.skipped;

            let written = self.sink.upsert(&page.records).await;
            records_written += written;
            info!(page = page_number, written, skipped = page.skipped, "Inserted/updated pulses");

            if let Some(max_pages) = self.options.max_pages {
                if pages >= max_pages {
                    info!(max_pages, "Reached max page limit, stopping");
                    break StopReason::PageLimit;
                }
            }

            match payload.next_url() {
                Some(next) => url = next.to_string(),
                None => {
                    info!(page = page_number, "No further pages");
                    break StopReason::Exhausted;
                },
            }

            tokio::time::sleep(self.options.page_delay).await;
        };

        SyncSummary {
            pages,
            records_written,
            records_skipped,
            stop_reason,
        }
    }
}
