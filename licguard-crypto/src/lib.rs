//! Cryptographic primitives for licguard.
//!
//! - Symmetric encryption: ChaCha20-Poly1305 with a random nonce per call
//! - Signatures: Ed25519, detached, base64 on the wire
//! - Hashing: SHA-256
//! - Key derivation: Argon2id
//! - Constant-time comparison and OS-backed randomness
//!
//! Encryption and signing failures are returned as [`CryptoError`];
//! signature verification answers `false` instead of failing.

mod cipher;
mod compare;
mod error;
mod hash;
mod key;
mod random;
mod sign;

pub use cipher::{
    decrypt, decrypt_string, encrypt, encrypt_string, EncryptedData, NONCE_SIZE, TAG_SIZE,
};
pub use compare::{secure_compare, secure_compare_str};
pub use error::{CryptoError, CryptoResult};
pub use hash::{hash_file, sha256, sha256_hex, DIGEST_SIZE};
pub use key::{
    derive_key, derive_key_bytes, generate_symmetric_key, KdfParams, Salt, SymmetricKey,
    DEFAULT_SALT, KEY_SIZE, SALT_SIZE,
};
pub use random::{random_bytes, random_string, random_string_from, ALPHANUMERIC, UPPER_ALPHANUMERIC};
pub use sign::{
    generate_keypair, sign, verify, PrivateKey, PublicKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE,
    SIGNATURE_SIZE,
};
