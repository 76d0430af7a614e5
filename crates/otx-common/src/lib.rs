//! OTX Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error handling and logging for the OTX pulse sync workspace.
//!
//! # Overview
//!
//! - **Types**: the page payload returned by the pulses API, the raw pulse
//!   item and the canonical [`PulseRecord`](types::PulseRecord) persisted to the store
//! - **Error Handling**: [`OtxError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use otx_common::types::PagePayload;
//!
//! let page: PagePayload = serde_json::from_str(r#"{"results": [], "next": null}"#).unwrap();
//! assert!(page.next_url().is_none());
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{OtxError, Result};
