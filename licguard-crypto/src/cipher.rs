//! Authenticated symmetric encryption of license payloads.
//!
//! ChaCha20-Poly1305 with a random 96-bit nonce per call. The stored form
//! is `nonce || ciphertext || tag`, base64 encoded when written as text.

use crate::error::{CryptoError, CryptoResult};
use crate::key::SymmetricKey;
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

/// Nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// A sealed payload and the nonce it was sealed with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the tag appended.
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Wire form: `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        [self.nonce.as_slice(), self.ciphertext.as_slice()].concat()
    }

    /// Parses the wire form. Anything shorter than a nonce plus a tag is
    /// rejected before decryption is attempted.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption(format!(
                "sealed payload is {} bytes, need at least {}",
                bytes.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let nonce: [u8; NONCE_SIZE] = nonce
            .try_into()
            .map_err(|_| CryptoError::Decryption("malformed nonce".to_string()))?;
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Decryption(format!("payload is not base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

fn cipher_for(key: &SymmetricKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(key.as_bytes().into())
}

/// Seals `plaintext` under `key`.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = cipher_for(key)
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData { nonce, ciphertext })
}

/// Opens a payload sealed by [`encrypt`]. A wrong key and a modified
/// payload are indistinguishable and both fail.
pub fn decrypt(key: &SymmetricKey, sealed: &EncryptedData) -> CryptoResult<Vec<u8>> {
    cipher_for(key)
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decryption("authentication tag mismatch".to_string()))
}

/// [`encrypt`] for text, returning the base64 wire form.
pub fn encrypt_string(key: &SymmetricKey, plaintext: &str) -> CryptoResult<String> {
    encrypt(key, plaintext.as_bytes()).map(|sealed| sealed.to_base64())
}

pub fn decrypt_string(key: &SymmetricKey, encoded: &str) -> CryptoResult<String> {
    let plaintext = decrypt(key, &EncryptedData::from_base64(encoded)?)?;
    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Decryption(format!("plaintext is not UTF-8: {e}")))
}
