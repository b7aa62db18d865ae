//! License issuance and signing.

use crate::error::{LicenseError, LicenseResult};
use crate::key::LicenseKey;
use crate::license::{Feature, License};
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use licguard_crypto::{sign, PrivateKey, PublicKey};
use tracing::{debug, info};

/// Creates and signs licenses with a vendor private key.
pub struct LicenseIssuer {
    private_key: PrivateKey,
}

impl LicenseIssuer {
    pub fn new(private_key: PrivateKey) -> Self {
        Self { private_key }
    }

    /// The public key validators need to check this issuer's signatures.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.private_key.public_key()
    }

    /// Issues a signed license for `tier`, bound to `machine_id`.
    ///
    /// Expires after the tier's default duration unless `custom_expiration`
    /// is given; a custom expiration at or before now fails with
    /// [`LicenseError::InvalidExpiration`]. Features are the tier's default set.
    pub fn issue(
        &self,
        tier: Tier,
        machine_id: &str,
        user_id: &str,
        product_name: &str,
        custom_expiration: Option<DateTime<Utc>>,
    ) -> LicenseResult<License> {
        self.issue_at(tier, machine_id, user_id, product_name, custom_expiration, Utc::now())
    }

    /// [`issue`](Self::issue) with an explicit issuance time.
    pub fn issue_at(
        &self,
        tier: Tier,
        machine_id: &str,
        user_id: &str,
        product_name: &str,
        custom_expiration: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> LicenseResult<License> {
        let expiration_date = custom_expiration.unwrap_or_else(|| now + tier.default_duration());
        if expiration_date <= now {
            return Err(LicenseError::InvalidExpiration {
                issued: now,
                expires: expiration_date,
            });
        }
        let key = LicenseKey::generate_at(tier.key_prefix(), now)?;

        let mut license = License {
            key: key.to_string(),
            machine_id: machine_id.to_string(),
            user_id: user_id.to_string(),
            product_name: product_name.to_string(),
            tier,
            issue_date: now,
            expiration_date,
            features: tier
                .entitlements()
                .default_features
                .iter()
                .map(|name| Feature::enabled(*name))
                .collect(),
            signature: String::new(),
            is_valid: true,
        };
        self.sign_license(&mut license)?;

        info!(
            tier = %tier,
            machine_id = %license.machine_id,
            expires = %license.expiration_date,
            "issued license"
        );
        Ok(license)
    }

    /// Issues a license for a tier given by name, e.g. `"premium"`.
    ///
    /// Unknown names fail with [`LicenseError::UnsupportedTier`].
    pub fn issue_for_tier(
        &self,
        tier: &str,
        machine_id: &str,
        user_id: &str,
        product_name: &str,
        custom_expiration: Option<DateTime<Utc>>,
    ) -> LicenseResult<License> {
        let tier: Tier = tier.parse()?;
        self.issue(tier, machine_id, user_id, product_name, custom_expiration)
    }

    /// Recomputes and attaches the signature over the license's canonical bytes.
    ///
    /// Must be called after any field change or the signature will no
    /// longer verify.
    pub fn sign_license(&self, license: &mut License) -> LicenseResult<()> {
        let bytes = license.canonical_bytes()?;
        license.signature = sign(&bytes, &self.private_key)?;
        debug!(tier = %license.tier, "signed license");
        Ok(())
    }

    /// Appends a feature and re-signs.
    pub fn add_feature(&self, license: &mut License, feature: Feature) -> LicenseResult<()> {
        license.features.push(feature);
        self.sign_license(license)
    }
}
