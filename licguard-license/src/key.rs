//! License key strings.
//!
//! Keys use the format `PREFIX-RANDOM-TIMESTAMP-CHECKSUM`:
//! - `PREFIX`: upper-case letters naming the tier (`TRIAL`, `PREMIUM`)
//! - `RANDOM`: 8 upper-case alphanumerics from the OS CSPRNG
//! - `TIMESTAMP`: last 6 digits of the issuance unix time (seconds)
//! - `CHECKSUM`: first 4 upper-case hex digits of SHA-256 over the first
//!   three segments joined by hyphens
//!
//! The checksum catches typos, not forgery. Forgery is caught by the
//! license signature.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Utc};
use licguard_crypto::{random_string_from, secure_compare_str, sha256_hex, UPPER_ALPHANUMERIC};
use regex_lite::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Length of the random segment.
pub const RANDOM_SEGMENT_LEN: usize = 8;

/// Length of the checksum segment.
pub const CHECKSUM_LEN: usize = 4;

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]+-[A-Z0-9]+-[0-9]+-[A-Z0-9]+$").expect("license key pattern is valid")
});

/// A structurally valid license key, split into its segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LicenseKey {
    prefix: String,
    random: String,
    timestamp: String,
    checksum: String,
}

impl LicenseKey {
    /// Generates a new key for `prefix` stamped with the current time.
    pub fn generate(prefix: &str) -> LicenseResult<Self> {
        Self::generate_at(prefix, Utc::now())
    }

    /// Generates a new key for `prefix` stamped with `now`.
    pub fn generate_at(prefix: &str, now: DateTime<Utc>) -> LicenseResult<Self> {
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(LicenseError::InvalidKeyFormat(
                "prefix must be upper-case letters".to_string(),
            ));
        }

        let random = random_string_from(RANDOM_SEGMENT_LEN, UPPER_ALPHANUMERIC);
        let timestamp = format!("{:06}", now.timestamp().rem_euclid(1_000_000));
        let checksum = compute_checksum(&format!("{prefix}-{random}-{timestamp}"));

        Ok(Self {
            prefix: prefix.to_string(),
            random,
            timestamp,
            checksum,
        })
    }

    /// Splits a key string into segments after checking the pattern.
    ///
    /// Does not verify the checksum; see [`LicenseKey::has_valid_checksum`].
    /// Surrounding whitespace is a format error.
    pub fn parse(key: &str) -> LicenseResult<Self> {
        if !KEY_PATTERN.is_match(key) {
            return Err(LicenseError::InvalidKeyFormat(
                "expected PREFIX-RANDOM-TIMESTAMP-CHECKSUM".to_string(),
            ));
        }

        let mut parts = key.split('-');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(random), Some(timestamp), Some(checksum)) => Ok(Self {
                prefix: prefix.to_string(),
                random: random.to_string(),
                timestamp: timestamp.to_string(),
                checksum: checksum.to_string(),
            }),
            _ => Err(LicenseError::InvalidKeyFormat(
                "key must have 4 parts separated by hyphens".to_string(),
            )),
        }
    }

    /// Recomputes the checksum over the first three segments and compares
    /// it in constant time.
    #[must_use]
    pub fn has_valid_checksum(&self) -> bool {
        let expected = compute_checksum(&self.body());
        secure_compare_str(&self.checksum, &expected)
    }

    /// The first three segments, hyphen-joined.
    #[must_use]
    pub fn body(&self) -> String {
        format!("{}-{}-{}", self.prefix, self.random, self.timestamp)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.body(), self.checksum)
    }
}

impl FromStr for LicenseKey {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Checksum segment for `body` (`PREFIX-RANDOM-TIMESTAMP`).
#[must_use]
pub fn compute_checksum(body: &str) -> String {
    sha256_hex(body.as_bytes())[..CHECKSUM_LEN].to_ascii_uppercase()
}
