//! Maps raw API pulses onto [`PulseRecord`]s

use chrono::{DateTime, Utc};
use otx_common::types::{PagePayload, PulseRecord, RawPulse};
use otx_common::{OtxError, Result};
use serde::Deserialize;
use tracing::warn;

/// Records produced from one page
#[derive(Debug, Default)]
pub struct NormalizedPage {
    /// Valid records, in API order
    pub records: Vec<PulseRecord>,
    /// Items dropped because a required field was missing
    pub skipped: usize,
}

/// Normalize every item on a page.
///
/// Malformed items are logged and skipped so they can never reach the store
/// under a bogus key. Each record is stamped with the time it was transformed.
pub fn normalize(payload: &PagePayload) -> NormalizedPage {
    let mut page = NormalizedPage::default();

    for (index, item) in payload.results().iter().enumerate() {
        match normalize_pulse(item, Utc::now()) {
            Ok(record) => page.records.push(record),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed pulse");
                page.skipped += 1;
            },
        }
    }

    page
}

/// Normalize a single raw pulse
pub fn normalize_pulse(item: &serde_json::Value, ingested_at: DateTime<Utc>) -> Result<PulseRecord> {
    let raw = RawPulse::deserialize(item).map_err(|e| OtxError::malformed(e.to_string()))?;

    let pulse_id = required(raw.id, "id")?;
    if pulse_id.trim().is_empty() {
        return Err(OtxError::malformed("empty `id`"));
    }

    Ok(PulseRecord {
        name: required(raw.name, "name")?,
        description: raw.description.unwrap_or_default(),
        created: required(raw.created, "created")?,
        modified: required(raw.modified, "modified")?,
        ingested_at,
        pulse_id,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| OtxError::malformed(format!("missing `{}`", field)))
}
