//! Crypto failures.

use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Signature verification never produces one of these: it answers `false`.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, tampered payload or malformed wire form.
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// Key material could not be decoded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}
