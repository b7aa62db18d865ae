mod common;

use chrono::{TimeZone, Utc};
use common::fixed_now;
use licguard_license::{compute_checksum, LicenseKey, CHECKSUM_LEN, RANDOM_SEGMENT_LEN};
use proptest::prelude::*;

fn is_upper_alnum(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

// ── Generation ───────────────────────────────────────────────────

#[test]
fn generated_key_has_four_segments() {
    let key = LicenseKey::generate("TRIAL").unwrap().to_string();
    let parts: Vec<&str> = key.split('-').collect();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], "TRIAL");
    assert_eq!(parts[1].len(), RANDOM_SEGMENT_LEN);
    assert!(is_upper_alnum(parts[1]));
    assert_eq!(parts[2].len(), 6);
    assert!(parts[2].bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(parts[3].len(), CHECKSUM_LEN);
    assert!(is_upper_alnum(parts[3]));
}

#[test]
fn generated_key_has_valid_checksum() {
    let key = LicenseKey::generate("PREMIUM").unwrap();
    assert!(key.has_valid_checksum());
}

#[test]
fn timestamp_is_last_six_digits() {
    let at = Utc.timestamp_opt(1_767_123_456, 0).unwrap();
    let key = LicenseKey::generate_at("TRIAL", at).unwrap().to_string();
    assert_eq!(key.split('-').nth(2), Some("123456"));
}

#[test]
fn timestamp_is_zero_padded() {
    let at = Utc.timestamp_opt(1_700_000_042, 0).unwrap();
    let key = LicenseKey::generate_at("TRIAL", at).unwrap().to_string();
    assert_eq!(key.split('-').nth(2), Some("000042"));
}

#[test]
fn generated_keys_differ() {
    let a = LicenseKey::generate_at("TRIAL", fixed_now()).unwrap();
    let b = LicenseKey::generate_at("TRIAL", fixed_now()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn lowercase_prefix_rejected() {
    assert!(LicenseKey::generate("trial").is_err());
}

#[test]
fn empty_prefix_rejected() {
    assert!(LicenseKey::generate("").is_err());
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parse_roundtrips_display() {
    let key = LicenseKey::generate("TRIAL").unwrap();
    let parsed = LicenseKey::parse(&key.to_string()).unwrap();
    assert_eq!(parsed, key);
    assert_eq!(parsed.prefix(), "TRIAL");
}

#[test]
fn from_str_parses() {
    let key: LicenseKey = "TRIAL-ABCD1234-123456-0000".parse().unwrap();
    assert_eq!(key.checksum(), "0000");
    assert_eq!(key.body(), "TRIAL-ABCD1234-123456");
}

#[test]
fn parse_rejects_bad_shapes() {
    for bad in [
        "",
        "invalid",
        "TRIAL-ABCD1234-123456",
        "TRIAL-ABCD1234-123456-ABCD-EXTRA",
        "trial-ABCD1234-123456-ABCD",
        "TRIAL-abcd1234-123456-ABCD",
        "TRIAL-ABCD1234-12345A-ABCD",
        "TRIAL--123456-ABCD",
        "TRIAL_ABCD1234_123456_ABCD",
    ] {
        assert!(LicenseKey::parse(bad).is_err(), "accepted {bad:?}");
    }
}

#[test]
fn parse_rejects_surrounding_whitespace() {
    let key = LicenseKey::generate("TRIAL").unwrap().to_string();
    for padded in [format!(" {key}"), format!("{key}\n"), format!("\t{key} ")] {
        assert!(LicenseKey::parse(&padded).is_err(), "accepted {padded:?}");
    }
    assert!(LicenseKey::parse(&key).is_ok());
}

#[test]
fn parse_does_not_check_checksum() {
    let key = LicenseKey::parse("TRIAL-ABCD1234-123456-ZZZZ").unwrap();
    assert!(!key.has_valid_checksum());
}

#[test]
fn checksum_is_upper_hex() {
    let checksum = compute_checksum("TRIAL-ABCD1234-123456");
    assert_eq!(checksum.len(), CHECKSUM_LEN);
    assert!(checksum.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)));
}

#[test]
fn checksum_is_deterministic() {
    assert_eq!(
        compute_checksum("PREMIUM-Q1W2E3R4-000001"),
        compute_checksum("PREMIUM-Q1W2E3R4-000001")
    );
}

// ── Mutation ─────────────────────────────────────────────────────

fn replacement(original: u8, pick: u8, alphabet: &[u8]) -> u8 {
    let candidates: Vec<u8> = alphabet.iter().copied().filter(|c| *c != original).collect();
    candidates[pick as usize % candidates.len()]
}

proptest! {
    #[test]
    fn body_mutation_breaks_checksum(index in 0usize..64, pick in any::<u8>()) {
        let key = LicenseKey::generate("TRIAL").unwrap();
        let text = key.to_string();
        let body_len = key.body().len();

        let mut bytes = text.clone().into_bytes();
        let positions: Vec<usize> = (0..body_len).filter(|i| bytes[*i] != b'-').collect();
        let pos = positions[index % positions.len()];
        let alphabet: &[u8] = if bytes[pos].is_ascii_digit() && text[..pos].matches('-').count() == 2 {
            b"0123456789"
        } else if text[..pos].matches('-').count() == 0 {
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZ"
        } else {
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"
        };
        bytes[pos] = replacement(bytes[pos], pick, alphabet);
        let mutated = String::from_utf8(bytes).unwrap();

        // A 16-bit checksum can collide; those mutations are not detectable.
        prop_assume!(compute_checksum(&mutated[..body_len]) != key.checksum());

        let parsed = LicenseKey::parse(&mutated).unwrap();
        prop_assert!(!parsed.has_valid_checksum());
    }

    #[test]
    fn checksum_mutation_is_detected(index in 0usize..CHECKSUM_LEN, pick in any::<u8>()) {
        let key = LicenseKey::generate("PREMIUM").unwrap();
        let mut bytes = key.to_string().into_bytes();
        let pos = bytes.len() - CHECKSUM_LEN + index;
        bytes[pos] = replacement(bytes[pos], pick, b"0123456789ABCDEF");
        let mutated = String::from_utf8(bytes).unwrap();

        let parsed = LicenseKey::parse(&mutated).unwrap();
        prop_assert!(!parsed.has_valid_checksum());
    }
}
