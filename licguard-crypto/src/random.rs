//! Randomness drawn from the operating system CSPRNG.

use rand::seq::SliceRandom;
use rand::RngCore;
use rand::rngs::OsRng;

/// Mixed-case alphanumeric alphabet.
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Upper-case alphanumeric alphabet.
pub const UPPER_ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Returns `len` random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Returns a random mixed-case alphanumeric string of `len` characters.
pub fn random_string(len: usize) -> String {
    random_string_from(len, ALPHANUMERIC)
}

/// Returns a random string of `len` characters drawn uniformly from `alphabet`.
///
/// `alphabet` must be non-empty ASCII.
pub fn random_string_from(len: usize, alphabet: &[u8]) -> String {
    let mut rng = OsRng;
    (0..len)
        .filter_map(|_| alphabet.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect()
}
