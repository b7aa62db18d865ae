//! Error types for license persistence.

use licguard_crypto::CryptoError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while persisting or loading a license.
///
/// [`LicenseStore::retrieve`](crate::LicenseStore::retrieve) degrades all of
/// these to "no license"; use `try_retrieve` to see which one occurred.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encryption, decryption or key decoding failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The plaintext or envelope is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The envelope was written with a different key.
    #[error("store key does not match the key the license was written with")]
    KeyMismatch,

    /// The envelope version is not understood.
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u32),

    /// A license file exists but its installation key is gone.
    #[error("installation key not found: {0}")]
    MissingInstallationKey(PathBuf),

    /// No per-user data directory on this platform.
    #[error("no application data directory available")]
    NoDataDirectory,
}
