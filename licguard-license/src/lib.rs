//! Licensing for licguard.
//!
//! This crate handles:
//! - The license model, its features and the tier entitlement catalog
//! - License key generation and checksum verification
//! - Hardware fingerprinting for machine binding
//! - Issuing and signing licenses with an Ed25519 vendor key
//! - Offline validation into a structured [`ValidationResult`]
//!
//! # License Key Format
//!
//! Keys are formatted as `PREFIX-RANDOM-TIMESTAMP-CHECKSUM`, for example
//! `TRIAL-7QK2M9XA-482913-1F0C`. The license itself carries a detached
//! base64 signature over its canonical JSON serialization.
//!
//! # Trust
//!
//! Issuance needs the vendor private key; validation only the public key.
//! The `is_valid` flag on a license is advisory. Only a full
//! [`LicenseValidator::validate`] run, including the signature stage,
//! establishes trust.

mod error;
mod fingerprint;
mod issuer;
mod key;
mod license;
mod result;
mod tier;
mod validator;

pub use error::{LicenseError, LicenseResult};
pub use fingerprint::{
    is_virtualized_environment, join_macs, matches_virtualization_vendor, Fingerprinter,
    HardwareProbe, HostnameProbe, MacAddressProbe, MachineFingerprint, OsVersionProbe,
    PlatformIdProbe, ProbeOutcome, ProcessorProbe, Unavailable, MACHINE_ID_LEN,
    MAX_MAC_ADDRESSES, UNKNOWN_MACHINE, VIRTUALIZATION_VENDORS,
};
pub use issuer::LicenseIssuer;
pub use key::{compute_checksum, LicenseKey, CHECKSUM_LEN, RANDOM_SEGMENT_LEN};
pub use license::{Feature, License};
pub use result::{SignatureFailure, ValidationError, ValidationResult, ValidationWarning};
pub use tier::{features, Tier, TierEntitlements};
pub use validator::{
    LicenseValidator, CLOCK_SKEW_TOLERANCE_SECS, EXPIRY_WARNING_DAYS, UNLIMITED_USERS,
};
