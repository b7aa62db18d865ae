//! Shared test helpers for store tests.

#![allow(dead_code)]

use licguard_crypto::PrivateKey;
use licguard_license::{License, LicenseIssuer, LicenseValidator, Tier};
use licguard_store::{LicenseStore, StoreConfig};
use std::path::PathBuf;
use tempfile::TempDir;

pub const MACHINE_ID: &str = "MID123";

pub fn test_issuer() -> LicenseIssuer {
    LicenseIssuer::new(PrivateKey::from_bytes(&[7u8; 32]))
}

pub fn test_validator() -> LicenseValidator {
    LicenseValidator::with_machine_id(test_issuer().public_key(), MACHINE_ID)
}

pub fn issue(tier: Tier) -> License {
    test_issuer()
        .issue(tier, MACHINE_ID, "user-1", "Store Test", None)
        .unwrap()
}

pub fn license_path(dir: &TempDir) -> PathBuf {
    dir.path().join("nested").join("license.lic")
}

/// A store using the installation key inside `dir`.
pub fn installation_store(dir: &TempDir) -> LicenseStore {
    LicenseStore::new(&StoreConfig::at(license_path(dir))).unwrap()
}
