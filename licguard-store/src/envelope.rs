//! On-disk envelope for licenses written with a caller-supplied key.
//!
//! ```json
//! { "encrypted_license": "<base64 nonce||ciphertext>",
//!   "key_hash": "<hex sha256 of the key>",
//!   "timestamp": "2026-03-01T12:00:00Z",
//!   "version": 1 }
//! ```
//!
//! `key_hash` lets a reader tell "wrong key" apart from "corrupt data"
//! without trying the decryption.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use licguard_crypto::{decrypt, encrypt, secure_compare_str, EncryptedData, SymmetricKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// An encrypted license plus the metadata needed to open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseEnvelope {
    pub encrypted_license: String,
    pub key_hash: String,
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}

impl LicenseEnvelope {
    /// Encrypts `plaintext` under `key`.
    pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> StoreResult<Self> {
        Ok(Self {
            encrypted_license: encrypt(key, plaintext)?.to_base64(),
            key_hash: key.key_hash(),
            timestamp: Utc::now(),
            version: ENVELOPE_VERSION,
        })
    }

    /// Checks version and key hash, then decrypts.
    pub fn open(&self, key: &SymmetricKey) -> StoreResult<Zeroizing<Vec<u8>>> {
        if self.version != ENVELOPE_VERSION {
            return Err(StoreError::UnsupportedVersion(self.version));
        }
        if !secure_compare_str(&self.key_hash, &key.key_hash()) {
            return Err(StoreError::KeyMismatch);
        }

        let encrypted = EncryptedData::from_base64(&self.encrypted_license)?;
        Ok(Zeroizing::new(decrypt(key, &encrypted)?))
    }
}
