//! Error types for the licensing module.
//!
//! These are raised only for structural failures at issuance time. Problems
//! found while validating a license are collected into a
//! [`ValidationResult`](crate::ValidationResult) instead.

use chrono::{DateTime, Utc};
use licguard_crypto::CryptoError;
use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The requested tier does not exist.
    #[error("unsupported license tier: {0}")]
    UnsupportedTier(String),

    /// Invalid license key format.
    #[error("invalid license key format: {0}")]
    InvalidKeyFormat(String),

    /// The requested expiration is not after the issue date.
    #[error("expiration {expires} must be after issue date {issued}")]
    InvalidExpiration {
        issued: DateTime<Utc>,
        expires: DateTime<Utc>,
    },

    /// A cryptographic primitive failed while signing.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
