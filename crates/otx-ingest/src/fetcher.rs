//! Page fetcher for the OTX pulses API
//!
//! Each call to [`OtxClient::fetch_page`] runs a small state machine:
//!
//! ```text
//! Requesting ──2xx──────────────▶ Succeeded
//!     │  ▲  ──429──▶ RateLimitWait ─┘ (budget untouched)
//!     │  └────────── Retrying ◀── other failure, budget left
//!     └──other failure, budget spent──▶ Exhausted
//! ```
//!
//! A 429 never consumes an attempt; only network errors, timeouts, non-2xx
//! statuses and undecodable bodies do.

use crate::config::{ApiConfig, RetryPolicy};
use otx_common::types::PagePayload;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Header carrying the OTX API key (`X-OTX-API-KEY`; header names are case-insensitive).
pub const API_KEY_HEADER: &str = "x-otx-api-key";

const USER_AGENT: &str = concat!("otx-ingest/", env!("CARGO_PKG_VERSION"));

/// Errors returned by the fetcher
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("API key is not a valid header value")]
    InvalidApiKey,

    #[error("giving up on {url} after {attempts} failed attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

/// Outcome of one HTTP request
enum Attempt {
    Page(PagePayload),
    RateLimited(Duration),
    Failed(reqwest::Error),
}

enum FetchState {
    Requesting,
    RateLimitWait(Duration),
    Retrying(reqwest::Error),
    Exhausted(reqwest::Error),
    Succeeded(PagePayload),
}

/// HTTP client for the subscribed-pulses feed
pub struct OtxClient {
    client: Client,
    policy: RetryPolicy,
}

impl OtxClient {
    /// Build a client that sends the API key on every request
    pub fn new(api: &ApiConfig, policy: RetryPolicy) -> Result<Self, FetchError> {
        let mut api_key =
            HeaderValue::from_str(&api.api_key).map_err(|_| FetchError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

        let client = Client::builder()
            .timeout(api.request_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, policy })
    }

    /// Fetch and decode one page, retrying per the client's [`RetryPolicy`]
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, url: &str) -> Result<PagePayload, FetchError> {
        let attempts = self.policy.attempts();
        let mut retries_left = attempts;
        let mut state = FetchState::Requesting;

        loop {
            state = match state {
                FetchState::Requesting => match self.attempt(url).await {
                    Attempt::Page(payload) => FetchState::Succeeded(payload),
                    Attempt::RateLimited(wait) => FetchState::RateLimitWait(wait),
                    Attempt::Failed(err) => {
                        retries_left = retries_left.saturating_sub(1);
                        if retries_left == 0 {
                            FetchState::Exhausted(err)
                        } else {
                            FetchState::Retrying(err)
                        }
                    },
                },
                FetchState::RateLimitWait(wait) => {
                    warn!(wait_secs = wait.as_secs_f64(), "Rate limit hit, waiting before retry");
                    tokio::time::sleep(wait).await;
                    FetchState::Requesting
                },
                FetchState::Retrying(err) => {
                    warn!(
                        error = %err,
                        retries_left,
                        delay_secs = self.policy.retry_delay.as_secs_f64(),
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    FetchState::Requesting
                },
                FetchState::Exhausted(err) => {
                    error!(error = %err, attempts, "Max retries reached, giving up on page");
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts,
                        source: err,
                    });
                },
                FetchState::Succeeded(payload) => {
                    debug!(items = payload.results().len(), "Page fetched");
                    return Ok(payload);
                },
            };
        }
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => return Attempt::Failed(err),
        };

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after(response.headers(), self.policy.default_rate_limit_wait);
            return Attempt::RateLimited(wait);
        }

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(err) => return Attempt::Failed(err),
        };

        match response.json::<PagePayload>().await {
            Ok(payload) => Attempt::Page(payload),
            Err(err) => Attempt::Failed(err),
        }
    }
}

/// Wait requested by a 429's `Retry-After` header, in whole seconds.
/// Missing or non-numeric values (including HTTP dates) fall back to `default`.
pub fn retry_after(headers: &HeaderMap, default: Duration) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
