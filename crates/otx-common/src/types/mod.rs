//! Common types used across OTX sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// API Types
// ============================================================================

/// One decoded page of the subscribed-pulses endpoint.
///
/// Items are kept as raw JSON so a single malformed pulse can be rejected
/// without failing the whole page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagePayload {
    /// Raw pulse objects in API order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<serde_json::Value>>,

    /// Absolute URL of the following page
    #[serde(default)]
    pub next: Option<String>,
}

impl PagePayload {
    /// Raw items on this page; an absent `results` field is an empty page
    pub fn results(&self) -> &[serde_json::Value] {
        self.results.as_deref().unwrap_or(&[])
    }

    /// Cursor to the next page, if any. An empty string counts as absent.
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref().filter(|url| !url.is_empty())
    }

    /// True when the body carried neither `results` nor `next`
    /// (e.g. `{}`), which the sync treats as "no data fetched".
    pub fn is_empty(&self) -> bool {
        self.results.is_none() && self.next.is_none()
    }
}

/// A pulse exactly as returned by the API.
///
/// Every field is optional here; required-ness is enforced when the pulse is
/// normalized into a [`PulseRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPulse {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

// ============================================================================
// Store Types
// ============================================================================

/// Canonical pulse document persisted to the store, keyed by `pulse_id`.
///
/// `created` and `modified` are opaque source timestamps copied verbatim;
/// `ingested_at` is stamped locally when the pulse is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseRecord {
    pub pulse_id: String,
    pub name: String,
    pub description: String,
    pub created: String,
    pub modified: String,
    pub ingested_at: DateTime<Utc>,
}
