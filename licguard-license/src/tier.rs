//! License tiers and the static entitlement catalog.

use crate::error::LicenseError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known feature names.
pub mod features {
    pub const BASIC_FEATURES: &str = "BasicFeatures";
    pub const LIMITED_EXPORT: &str = "LimitedExport";
    pub const ADVANCED_FEATURES: &str = "AdvancedFeatures";
    pub const UNLIMITED_EXPORT: &str = "UnlimitedExport";
    pub const PRIORITY_SUPPORT: &str = "PrioritySupport";
    pub const CUSTOMIZATION_TOOLS: &str = "CustomizationTools";
    /// Value-carrying feature limiting concurrent users.
    pub const MAX_USERS: &str = "MaxUsers";
}

use features::*;

/// A named entitlement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Time-limited evaluation.
    Trial,
    /// Paid, full feature set.
    Premium,
}

/// Limits and defaults for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierEntitlements {
    /// Feature names a license of this tier may carry.
    pub allowed_features: &'static [&'static str],
    /// Features granted at issuance.
    pub default_features: &'static [&'static str],
    /// Maximum number of enabled features.
    pub max_features: usize,
    /// Maximum `MaxUsers` value, or `None` for unlimited.
    pub max_users: Option<u32>,
    /// License lifetime when no explicit expiration is given.
    pub default_duration_days: i64,
}

static TRIAL: TierEntitlements = TierEntitlements {
    allowed_features: &[BASIC_FEATURES, LIMITED_EXPORT, MAX_USERS],
    default_features: &[BASIC_FEATURES, LIMITED_EXPORT],
    max_features: 3,
    max_users: Some(1),
    default_duration_days: 14,
};

static PREMIUM: TierEntitlements = TierEntitlements {
    allowed_features: &[
        BASIC_FEATURES,
        ADVANCED_FEATURES,
        UNLIMITED_EXPORT,
        PRIORITY_SUPPORT,
        CUSTOMIZATION_TOOLS,
        MAX_USERS,
    ],
    default_features: &[
        BASIC_FEATURES,
        ADVANCED_FEATURES,
        UNLIMITED_EXPORT,
        PRIORITY_SUPPORT,
        CUSTOMIZATION_TOOLS,
    ],
    max_features: 10,
    max_users: None,
    default_duration_days: 365,
};

impl Tier {
    /// All tiers, in ascending order.
    pub const ALL: [Tier; 2] = [Tier::Trial, Tier::Premium];

    /// Returns the entitlement catalog entry for this tier.
    #[must_use]
    pub fn entitlements(&self) -> &'static TierEntitlements {
        match self {
            Self::Trial => &TRIAL,
            Self::Premium => &PREMIUM,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Trial => "Trial",
            Self::Premium => "Premium",
        }
    }

    /// Upper-case prefix used in license keys.
    #[must_use]
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Trial => "TRIAL",
            Self::Premium => "PREMIUM",
        }
    }

    /// Maximum number of enabled features.
    #[must_use]
    pub fn max_features(&self) -> usize {
        self.entitlements().max_features
    }

    /// Maximum user count, or `None` for unlimited.
    #[must_use]
    pub fn max_users(&self) -> Option<u32> {
        self.entitlements().max_users
    }

    /// Default license lifetime.
    #[must_use]
    pub fn default_duration(&self) -> Duration {
        Duration::days(self.entitlements().default_duration_days)
    }

    /// Whether `feature` (case-insensitive) may appear on a license of this tier.
    #[must_use]
    pub fn allows(&self, feature: &str) -> bool {
        self.entitlements()
            .allowed_features
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(feature))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Tier {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.display_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LicenseError::UnsupportedTier(s.to_string()))
    }
}
