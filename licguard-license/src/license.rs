//! The license entity and its features.

use crate::error::LicenseResult;
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entitlement carried by a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name, compared case-insensitively.
    pub name: String,
    /// Whether the feature is switched on.
    pub enabled: bool,
    /// Optional expiry of this feature alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Optional parameter, e.g. a user count for `MaxUsers`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Feature {
    /// An enabled feature with no expiry or value.
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            expiration_date: None,
            value: None,
        }
    }

    /// A disabled feature.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::enabled(name)
        }
    }

    /// Sets the feature's own expiry.
    #[must_use]
    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expiration_date = Some(at);
        self
    }

    /// Sets the feature's value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Whether `name` refers to this feature.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A machine-bound, signed software license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// `PREFIX-RANDOM-TIMESTAMP-CHECKSUM`.
    pub key: String,
    /// Fingerprint id of the machine this license is bound to.
    pub machine_id: String,
    pub user_id: String,
    pub product_name: String,
    pub tier: Tier,
    pub issue_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    /// Insertion order is kept for display only.
    pub features: Vec<Feature>,
    /// Base64 Ed25519 signature over [`License::canonical_bytes`].
    #[serde(default)]
    pub signature: String,
    /// Advisory flag set at issuance. Never a trust signal on its own.
    pub is_valid: bool,
}

/// Borrowed view of every field except the signature, in a fixed order.
#[derive(Serialize)]
struct CanonicalLicense<'a> {
    key: &'a str,
    machine_id: &'a str,
    user_id: &'a str,
    product_name: &'a str,
    tier: Tier,
    issue_date: &'a DateTime<Utc>,
    expiration_date: &'a DateTime<Utc>,
    features: &'a [Feature],
    is_valid: bool,
}

impl License {
    /// The bytes covered by the detached signature.
    ///
    /// Compact JSON with a fixed field order; the signature itself is excluded.
    pub fn canonical_bytes(&self) -> LicenseResult<Vec<u8>> {
        let canonical = CanonicalLicense {
            key: &self.key,
            machine_id: &self.machine_id,
            user_id: &self.user_id,
            product_name: &self.product_name,
            tier: self.tier,
            issue_date: &self.issue_date,
            expiration_date: &self.expiration_date,
            features: &self.features,
            is_valid: self.is_valid,
        };
        Ok(serde_json::to_vec(&canonical)?)
    }

    /// Whether the license is past its expiration date.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the license is past its expiration date at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date <= now
    }

    /// Advisory flag and not expired. Not a substitute for validation.
    #[must_use]
    pub fn is_valid_license(&self) -> bool {
        self.is_valid && !self.is_expired()
    }

    /// Looks up a feature by name (case-insensitive).
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.is_named(name))
    }

    /// Returns a feature's value, or `default` when absent or valueless.
    #[must_use]
    pub fn feature_value<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.feature(name)
            .and_then(|f| f.value.as_deref())
            .unwrap_or(default)
    }

    /// Number of enabled features.
    #[must_use]
    pub fn enabled_feature_count(&self) -> usize {
        self.features.iter().filter(|f| f.enabled).count()
    }

    /// Whether a signature has been attached.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !self.signature.trim().is_empty()
    }
}
