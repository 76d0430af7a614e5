//! Sync configuration
//!
//! Everything the job needs from its environment: API credentials, the store
//! connection, and the retry/pacing knobs. Values come from the process
//! environment (after loading `.env`) with the defaults below.

use otx_common::{OtxError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default OTX API base URL.
pub const DEFAULT_OTX_BASE_URL: &str = "https://otx.alienvault.com";

/// Path of the subscribed-pulses endpoint, relative to the base URL.
pub const SUBSCRIBED_PULSES_PATH: &str = "/api/v1/pulses/subscribed";

/// Per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Attempts per page before the fetch is abandoned. 429 responses do not count.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fixed delay after a transient failure, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Wait applied to a 429 without a usable `Retry-After`, in seconds.
pub const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 10;

/// Pacing interval between page requests, in seconds.
pub const DEFAULT_PAGE_DELAY_SECS: u64 = 6;

/// Page ceiling used by the binary when none is given.
pub const DEFAULT_MAX_PAGES: u32 = 3;

/// Store connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Full job configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api: ApiConfig,
    pub retry: RetryPolicy,
    pub database: DatabaseConfig,
    /// Sleep between consecutive page requests
    pub page_delay: Duration,
}

/// OTX API access
#[derive(Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

/// Retry and rate-limit policy for a single page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed for non-429 failures
    pub max_attempts: u32,
    /// Delay after each failed attempt
    pub retry_delay: Duration,
    /// Wait used when a 429 carries no parseable `Retry-After`
    pub default_rate_limit_wait: Duration,
}

/// Store connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URI
    pub url: String,
    /// Overrides the database named in `url`
    pub name: Option<String>,
    pub connect_timeout: Duration,
}

impl SyncConfig {
    /// Load `.env`, read the environment and validate the result
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env();
        config.validate()?;

        Ok(config)
    }

    /// Read configuration from the environment without validating it
    pub fn from_env() -> Self {
        SyncConfig {
            api: ApiConfig {
                api_key: std::env::var("OTX_API_KEY").unwrap_or_default(),
                base_url: std::env::var("OTX_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_OTX_BASE_URL.to_string()),
                request_timeout: env_secs("OTX_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            retry: RetryPolicy {
                max_attempts: env_or("OTX_MAX_RETRIES", DEFAULT_MAX_RETRIES),
                retry_delay: env_secs("OTX_RETRY_DELAY", DEFAULT_RETRY_DELAY_SECS),
                default_rate_limit_wait: env_secs(
                    "OTX_RATE_LIMIT_DEFAULT_WAIT",
                    DEFAULT_RATE_LIMIT_WAIT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").unwrap_or_default(),
                name: std::env::var("DATABASE_NAME")
                    .ok()
                    .filter(|name| !name.trim().is_empty()),
                connect_timeout: env_secs(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            page_delay: env_secs("OTX_PAGE_DELAY", DEFAULT_PAGE_DELAY_SECS),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.trim().is_empty() {
            return Err(OtxError::config("OTX_API_KEY must be set"));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(OtxError::config("OTX_BASE_URL cannot be empty"));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(OtxError::config(format!(
                "OTX_BASE_URL must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }

        if self.api.request_timeout.is_zero() {
            return Err(OtxError::config("OTX_REQUEST_TIMEOUT must be greater than 0"));
        }

        if self.retry.max_attempts == 0 {
            return Err(OtxError::config("OTX_MAX_RETRIES must be greater than 0"));
        }

        if self.database.url.trim().is_empty() {
            return Err(OtxError::config("DATABASE_URL must be set"));
        }

        if self.database.connect_timeout.is_zero() {
            return Err(OtxError::config("DATABASE_CONNECT_TIMEOUT must be greater than 0"));
        }

        Ok(())
    }
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// First page of the subscribed-pulses feed
    pub fn subscribed_pulses_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), SUBSCRIBED_PULSES_PATH)
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl RetryPolicy {
    /// Attempts actually made per page; never less than one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            default_rate_limit_wait: Duration::from_secs(DEFAULT_RATE_LIMIT_WAIT_SECS),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_or(key, default))
}
