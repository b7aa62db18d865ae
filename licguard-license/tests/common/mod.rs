//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use licguard_license::{
    HardwareProbe, License, LicenseIssuer, LicenseValidator, Tier, Unavailable,
};
use licguard_crypto::{PrivateKey, PublicKey};

pub const MACHINE_ID: &str = "MID123";
pub const OTHER_MACHINE_ID: &str = "MID999";
pub const USER_ID: &str = "user-42";
pub const PRODUCT: &str = "Licguard Demo";

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (PrivateKey, PublicKey) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let private_key = PrivateKey::from_bytes(&seed);
    let public_key = private_key.public_key();
    (private_key, public_key)
}

pub fn test_issuer() -> LicenseIssuer {
    LicenseIssuer::new(test_keypair().0)
}

/// Validator that believes it runs on [`MACHINE_ID`].
pub fn test_validator() -> LicenseValidator {
    LicenseValidator::with_machine_id(test_keypair().1, MACHINE_ID)
}

/// A fixed instant, for deterministic date arithmetic.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Issues a signed license at [`fixed_now`] for [`MACHINE_ID`].
pub fn issue_at_fixed_now(tier: Tier) -> License {
    test_issuer()
        .issue_at(tier, MACHINE_ID, USER_ID, PRODUCT, None, fixed_now())
        .unwrap()
}

/// Probe with a canned answer.
pub struct FixedProbe {
    pub name: &'static str,
    pub value: Option<&'static str>,
}

impl FixedProbe {
    pub fn ok(name: &'static str, value: &'static str) -> Box<dyn HardwareProbe> {
        Box::new(Self {
            name,
            value: Some(value),
        })
    }

    pub fn unavailable(name: &'static str) -> Box<dyn HardwareProbe> {
        Box::new(Self { name, value: None })
    }
}

impl HardwareProbe for FixedProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn probe(&self) -> Result<String, Unavailable> {
        self.value
            .map(str::to_string)
            .ok_or_else(|| Unavailable("not in this test".to_string()))
    }
}
