//! Store keys: random installation keys and Argon2id password derivation.

use crate::error::{CryptoError, CryptoResult};
use crate::hash::sha256;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// ChaCha20 key length.
pub const KEY_SIZE: usize = 32;

/// Length of [`Salt::random`] output.
pub const SALT_SIZE: usize = 16;

/// Fallback salt used when the caller supplies none.
///
/// A fixed salt makes derived keys predictable across installations. Only use
/// it where the derived key protects nothing secret.
pub const DEFAULT_SALT: [u8; SALT_SIZE] = *b"licguard-salt-v1";

/// A 256-bit key, wiped on drop. `Debug` never prints the bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Fails with [`CryptoError::InvalidKeyLength`] unless `bytes` is exactly 32 long.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| CryptoError::InvalidKey(format!("invalid base64: {e}")))?,
        );
        Self::from_slice(&decoded)
    }

    /// Base64 form, as written to `install.key`.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Returns a hex SHA-256 of the key, safe to store next to ciphertext.
    ///
    /// Lets a reader confirm it holds the right key without exposing it.
    pub fn key_hash(&self) -> String {
        hex::encode(sha256(&self.bytes))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct Salt {
    bytes: Vec<u8>,
}

impl Salt {
    pub fn random() -> Self {
        let mut bytes = vec![0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Salt {
    /// The fixed [`DEFAULT_SALT`]. Weak: see its documentation.
    fn default() -> Self {
        Self::from_bytes(DEFAULT_SALT)
    }
}

/// Argon2id cost settings.
#[derive(Clone, Debug)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost: passes over memory.
    pub iterations: u32,
    /// Parallelism factor.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Derives `output_len` bytes from a password using Argon2id.
///
/// `salt` falls back to [`DEFAULT_SALT`] when `None`.
pub fn derive_key_bytes(
    password: &str,
    salt: Option<&Salt>,
    params: &KdfParams,
    output_len: usize,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let default_salt;
    let salt = match salt {
        Some(salt) => salt,
        None => {
            default_salt = Salt::default();
            &default_salt
        }
    };

    let cost = Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(output_len),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut output = Zeroizing::new(vec![0u8; output_len]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, cost)
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(output)
}

/// Derives a symmetric key from a password using Argon2id.
pub fn derive_key(
    password: &str,
    salt: Option<&Salt>,
    params: &KdfParams,
) -> CryptoResult<SymmetricKey> {
    let bytes = derive_key_bytes(password, salt, params, KEY_SIZE)?;
    SymmetricKey::from_slice(&bytes)
}

/// A fresh key from the OS RNG.
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut key = SymmetricKey::from_bytes([0u8; KEY_SIZE]);
    OsRng.fill_bytes(&mut key.bytes);
    key
}
