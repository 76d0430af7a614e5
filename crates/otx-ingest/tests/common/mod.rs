//! Shared helpers for otx-ingest integration tests
//!
//! - [`MemoryStore`]: a `PulseStore` backed by a `HashMap`, with optional
//!   fault injection
//! - Fast retry policies so retry/backoff paths run in milliseconds
//! - Builders for mock API bodies

#![allow(dead_code)]

use async_trait::async_trait;
use otx_common::types::PulseRecord;
use otx_ingest::config::{ApiConfig, RetryPolicy};
use otx_ingest::fetcher::OtxClient;
use otx_ingest::store::{PulseStore, StoreError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "test-api-key";
pub const PULSES_PATH: &str = "/api/v1/pulses/subscribed";

/// In-memory pulse store keyed by `pulse_id`
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, PulseRecord>>,
    writes: AtomicUsize,
    fail_on: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every upsert of `pulse_id`
    pub fn failing_on(pulse_id: &str) -> Self {
        let store = Self::default();
        *store.fail_on.lock().unwrap() = Some(pulse_id.to_string());
        store
    }

    pub fn get(&self, pulse_id: &str) -> Option<PulseRecord> {
        self.docs.lock().unwrap().get(pulse_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    /// Upsert calls made, including failed ones
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PulseStore for MemoryStore {
    async fn upsert_pulse(&self, record: &PulseRecord) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.fail_on.lock().unwrap().as_deref() == Some(record.pulse_id.as_str()) {
            return Err(StoreError::Backend(format!(
                "write rejected for {}",
                record.pulse_id
            )));
        }

        self.docs
            .lock()
            .unwrap()
            .insert(record.pulse_id.clone(), record.clone());
        Ok(())
    }
}

/// Retry policy with millisecond delays
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        retry_delay: Duration::from_millis(20),
        default_rate_limit_wait: Duration::from_millis(20),
    }
}

pub fn api_config(server: &MockServer) -> ApiConfig {
    let mut api = ApiConfig::new(TEST_API_KEY, server.uri());
    api.request_timeout = Duration::from_secs(2);
    api
}

pub fn test_client(server: &MockServer, policy: RetryPolicy) -> OtxClient {
    OtxClient::new(&api_config(server), policy).expect("client should build")
}

pub fn pulse(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{} description", name),
        "created": "2024-01-01T00:00:00Z",
        "modified": "2024-01-02T00:00:00Z",
        "tags": ["test"]
    })
}

pub fn page(results: Vec<Value>, next: Option<String>) -> Value {
    json!({
        "count": results.len(),
        "results": results,
        "next": next
    })
}
