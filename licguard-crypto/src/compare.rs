//! Constant-time equality.

use subtle::ConstantTimeEq;

/// Compares two byte slices without leaking the position of a mismatch.
///
/// Unequal lengths return `false` immediately, which reveals the length
/// difference. Equal-length inputs are always compared in full.
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    bool::from(a.ct_eq(b))
}

/// [`secure_compare`] over the UTF-8 bytes of two strings.
pub fn secure_compare_str(a: &str, b: &str) -> bool {
    secure_compare(a.as_bytes(), b.as_bytes())
}
