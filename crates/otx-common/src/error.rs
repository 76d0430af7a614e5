//! Error types for OTX sync

use thiserror::Error;

/// Result type alias for OTX operations
pub type Result<T> = std::result::Result<T, OtxError>;

/// Main error type shared across the workspace
#[derive(Error, Debug)]
pub enum OtxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed pulse: {0}")]
    MalformedPulse(String),
}

impl OtxError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        OtxError::Config(msg.into())
    }

    /// Shorthand for a malformed pulse error
    pub fn malformed(msg: impl Into<String>) -> Self {
        OtxError::MalformedPulse(msg.into())
    }
}
