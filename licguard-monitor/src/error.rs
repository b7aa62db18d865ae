//! Error types for the trust monitor.

use thiserror::Error;

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors raised while setting up monitoring.
///
/// Checks themselves never error: an unreadable probe counts as "no
/// evidence" and a failed integrity read counts as tampering.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or config is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The manifest version is not understood.
    #[error("unsupported manifest version: {0}")]
    UnsupportedManifestVersion(u32),

    /// The configuration is unusable.
    #[error("invalid monitor config: {0}")]
    InvalidConfig(String),
}
