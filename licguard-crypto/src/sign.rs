//! Ed25519 detached signatures.
//!
//! Signatures and keys travel as standard base64 strings. Verification never
//! fails with an error: malformed keys or signatures simply do not verify.

use crate::error::{CryptoError, CryptoResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroizing;

/// Length of an encoded public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Length of an encoded private key seed in bytes.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Length of a raw signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// The verifying half of a key pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Creates a public key from its 32-byte encoding.
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_SIZE]) -> CryptoResult<Self> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidKey("not a valid Ed25519 point".to_string()))
    }

    /// Decodes a base64-encoded public key.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("invalid base64: {e}")))?;
        let bytes: [u8; PUBLIC_KEY_SIZE] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: PUBLIC_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Self::from_bytes(&bytes)
    }

    /// Returns the 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Encodes the key as base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.to_bytes())
    }
}

/// The signing half of a key pair. Zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Creates a private key from its 32-byte seed.
    pub fn from_bytes(seed: &[u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// Decodes a base64-encoded private key seed.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| CryptoError::InvalidKey(format!("invalid base64: {e}")))?,
        );
        let seed: &[u8; PRIVATE_KEY_SIZE] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: PRIVATE_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self::from_bytes(seed))
    }

    /// Encodes the seed as base64. The caller owns the secrecy of the output.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.0.to_bytes()))
    }

    /// Returns the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public_key().to_base64())
            .finish()
    }
}

/// Generates a fresh key pair from the OS random source.
pub fn generate_keypair() -> (PublicKey, PrivateKey) {
    let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
    let private = PrivateKey(signing_key);
    (private.public_key(), private)
}

/// Signs `data` and returns the base64-encoded detached signature.
pub fn sign(data: &[u8], private_key: &PrivateKey) -> CryptoResult<String> {
    let signature = private_key
        .0
        .try_sign(data)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(STANDARD.encode(signature.to_bytes()))
}

/// Verifies a base64-encoded detached signature over `data`.
///
/// Returns `false` for any malformed input instead of an error.
pub fn verify(data: &[u8], signature: &str, public_key: &PublicKey) -> bool {
    let Ok(sig_bytes) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    public_key.0.verify(data, &signature).is_ok()
}
