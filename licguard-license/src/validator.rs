//! The license validation pipeline.
//!
//! Validation never fails: every stage reports into a [`ValidationResult`]
//! and all stages run, so callers always see the full list of problems.
//! Stages, in order:
//!
//! 1. format (key shape and checksum, machine id, dates, advisory flag)
//! 2. expiration (expired is an error, expiring within a week is a warning)
//! 3. hardware binding against the current machine id
//! 4. signature (skippable)
//! 5. per-feature entitlements and aggregate tier limits

use crate::fingerprint::Fingerprinter;
use crate::key::LicenseKey;
use crate::license::License;
use crate::result::{SignatureFailure, ValidationError, ValidationResult, ValidationWarning};
use crate::tier::features::MAX_USERS;
use chrono::{DateTime, Duration, Utc};
use licguard_crypto::{secure_compare_str, verify, PublicKey};
use tracing::{debug, warn};

/// Allowed clock drift between issuer and validator, in seconds.
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 5 * 60;

/// Licenses expiring within this many days produce a warning.
pub const EXPIRY_WARNING_DAYS: i64 = 7;

fn clock_skew_tolerance() -> Duration {
    Duration::seconds(CLOCK_SKEW_TOLERANCE_SECS)
}

/// `MaxUsers` value that bypasses the user limit check.
pub const UNLIMITED_USERS: &str = "unlimited";

/// Validates licenses against a vendor public key and the current machine.
#[derive(Debug, Clone)]
pub struct LicenseValidator {
    public_key: PublicKey,
    /// `None` when the fingerprint could not be computed.
    current_machine_id: Option<String>,
}

impl LicenseValidator {
    /// A validator bound to this machine's fingerprint.
    pub fn for_current_machine(public_key: PublicKey) -> Self {
        Self::with_fingerprinter(public_key, &Fingerprinter::system())
    }

    /// A validator whose machine id comes from `fingerprinter`.
    pub fn with_fingerprinter(public_key: PublicKey, fingerprinter: &Fingerprinter) -> Self {
        let fingerprint = fingerprinter.compute();
        let current_machine_id = if fingerprint.is_degraded() {
            None
        } else {
            Some(fingerprint.machine_id().to_string())
        };
        Self {
            public_key,
            current_machine_id,
        }
    }

    /// A validator that treats `machine_id` as the current machine.
    pub fn with_machine_id(public_key: PublicKey, machine_id: impl Into<String>) -> Self {
        Self {
            public_key,
            current_machine_id: Some(machine_id.into()),
        }
    }

    /// The machine id licenses are checked against.
    #[must_use]
    pub fn current_machine_id(&self) -> Option<&str> {
        self.current_machine_id.as_deref()
    }

    /// Runs every stage against the current time.
    #[must_use]
    pub fn validate(&self, license: Option<&License>, skip_signature: bool) -> ValidationResult {
        self.validate_at(license, skip_signature, Utc::now())
    }

    /// Runs every stage against `now`.
    #[must_use]
    pub fn validate_at(
        &self,
        license: Option<&License>,
        skip_signature: bool,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        let Some(license) = license else {
            return ValidationResult::from_error(ValidationError::MissingLicense);
        };

        let mut result = ValidationResult::new();
        result.combine(self.validate_format_at(license, now));
        result.combine(self.validate_expiration_at(license, now));
        result.combine(self.validate_hardware_binding(license));
        if !skip_signature {
            result.combine(self.validate_signature(license));
        }
        result.combine(self.validate_features_at(license, now));

        if result.is_valid() {
            debug!(tier = %license.tier, summary = %result.summary(), "license validated");
        } else {
            warn!(
                tier = %license.tier,
                errors = result.errors.len(),
                "license failed validation"
            );
        }
        result
    }

    // ── Format ───────────────────────────────────────────────────

    #[must_use]
    pub fn validate_format(&self, license: &License) -> ValidationResult {
        self.validate_format_at(license, Utc::now())
    }

    #[must_use]
    pub fn validate_format_at(&self, license: &License, now: DateTime<Utc>) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.combine(validate_key(&license.key));

        if license.machine_id.trim().is_empty() {
            result.add_error(format_error("Machine ID is required"));
        }
        if license.issue_date > now + clock_skew_tolerance() {
            result.add_error(format_error("License issue date is in the future"));
        }
        if license.expiration_date <= license.issue_date {
            result.add_error(format_error(
                "License expiration date must be after issue date",
            ));
        }
        if !license.is_valid {
            result.add_error(format_error("License is marked as invalid"));
        }

        result
    }

    // ── Expiration ───────────────────────────────────────────────

    #[must_use]
    pub fn validate_expiration(&self, license: &License) -> ValidationResult {
        self.validate_expiration_at(license, Utc::now())
    }

    #[must_use]
    pub fn validate_expiration_at(
        &self,
        license: &License,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if license.is_expired_at(now) {
            let elapsed = now - license.expiration_date;
            result.add_error(ValidationError::Expired(format!(
                "License expired {} days, {} hours ago",
                elapsed.num_days(),
                elapsed.num_hours() % 24
            )));
        } else {
            let remaining = license.expiration_date - now;
            if remaining <= Duration::days(EXPIRY_WARNING_DAYS) {
                result.add_warning(ValidationWarning::Expiring(format!(
                    "License expires in {} days, {} hours",
                    remaining.num_days(),
                    remaining.num_hours() % 24
                )));
            }
        }

        result
    }

    // ── Hardware binding ─────────────────────────────────────────

    #[must_use]
    pub fn validate_hardware_binding(&self, license: &License) -> ValidationResult {
        let Some(current) = self.current_machine_id.as_deref() else {
            return ValidationResult::from_error(ValidationError::FingerprintUnavailable);
        };

        if secure_compare_str(current, &license.machine_id) {
            ValidationResult::new()
        } else {
            ValidationResult::from_error(ValidationError::HardwareMismatch)
        }
    }

    // ── Signature ────────────────────────────────────────────────

    #[must_use]
    pub fn validate_signature(&self, license: &License) -> ValidationResult {
        if !license.is_signed() {
            return ValidationResult::from_error(ValidationError::Signature(
                SignatureFailure::Missing,
            ));
        }

        let verified = license
            .canonical_bytes()
            .map(|bytes| verify(&bytes, &license.signature, &self.public_key))
            .unwrap_or(false);

        if verified {
            ValidationResult::new()
        } else {
            ValidationResult::from_error(ValidationError::Signature(SignatureFailure::Invalid))
        }
    }

    // ── Entitlements ─────────────────────────────────────────────

    /// Checks every feature on the license, then the tier limits.
    #[must_use]
    pub fn validate_features(&self, license: &License) -> ValidationResult {
        self.validate_features_at(license, Utc::now())
    }

    #[must_use]
    pub fn validate_features_at(&self, license: &License, now: DateTime<Utc>) -> ValidationResult {
        license
            .features
            .iter()
            .map(|feature| self.validate_feature_at(license, &feature.name, now))
            .fold(ValidationResult::new(), ValidationResult::combined)
            .combined(self.validate_tier_limits(license))
    }

    /// Checks a single named feature: present, enabled, unexpired, and
    /// allowed for the license's tier.
    #[must_use]
    pub fn validate_feature(&self, license: &License, name: &str) -> ValidationResult {
        self.validate_feature_at(license, name, Utc::now())
    }

    #[must_use]
    pub fn validate_feature_at(
        &self,
        license: &License,
        name: &str,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if name.trim().is_empty() {
            result.add_error(entitlement_error("Feature name cannot be empty".to_string()));
            return result;
        }

        let Some(feature) = license.feature(name) else {
            result.add_error(entitlement_error(format!(
                "Feature '{name}' not found in license"
            )));
            return result;
        };

        if !feature.enabled {
            result.add_error(entitlement_error(format!("Feature '{name}' is disabled")));
        }
        // A deadline past the representable range never expires.
        if feature
            .expiration_date
            .and_then(|expires| expires.checked_add_signed(clock_skew_tolerance()))
            .is_some_and(|deadline| deadline < now)
        {
            result.add_error(entitlement_error(format!("Feature '{name}' has expired")));
        }
        if !license.tier.allows(name) {
            result.add_error(entitlement_error(format!(
                "Feature '{name}' is not available for {} tier",
                license.tier
            )));
        }

        result
    }

    /// Aggregate limits: enabled-feature count and `MaxUsers` value.
    #[must_use]
    pub fn validate_tier_limits(&self, license: &License) -> ValidationResult {
        let mut result = ValidationResult::new();
        let tier = license.tier;

        if let (Some(max_users), Some(value)) = (
            tier.max_users(),
            license.feature(MAX_USERS).and_then(|f| f.value.as_deref()),
        ) {
            let value = value.trim();
            if !value.eq_ignore_ascii_case(UNLIMITED_USERS) {
                match value.parse::<u64>() {
                    Ok(limit) if limit > u64::from(max_users) => {
                        result.add_error(entitlement_error(format!(
                            "User limit ({limit}) exceeds maximum for {tier} tier ({max_users})"
                        )));
                    }
                    Ok(_) => {}
                    Err(_) => debug!(value, "ignoring non-numeric MaxUsers value"),
                }
            }
        }

        let enabled = license.enabled_feature_count();
        let max_features = tier.max_features();
        if enabled > max_features {
            result.add_error(entitlement_error(format!(
                "Number of enabled features ({enabled}) exceeds maximum for {tier} tier ({max_features})"
            )));
        }

        result
    }

    /// Whether `name` passes [`validate_feature`](Self::validate_feature).
    #[must_use]
    pub fn has_feature(&self, license: &License, name: &str) -> bool {
        self.validate_feature(license, name).is_valid()
    }
}

/// Checks key shape and checksum.
fn validate_key(key: &str) -> ValidationResult {
    if key.trim().is_empty() {
        return ValidationResult::from_error(format_error("License key is empty or null"));
    }

    match LicenseKey::parse(key) {
        Ok(parsed) if parsed.has_valid_checksum() => ValidationResult::new(),
        Ok(_) => ValidationResult::from_error(format_error(
            "License key checksum verification failed",
        )),
        Err(_) => ValidationResult::from_error(format_error(
            "License key format is invalid. Expected format: PREFIX-RANDOM-TIMESTAMP-CHECKSUM",
        )),
    }
}

fn format_error(message: &str) -> ValidationError {
    ValidationError::Format(message.to_string())
}

fn entitlement_error(message: String) -> ValidationError {
    ValidationError::Entitlement(message)
}
