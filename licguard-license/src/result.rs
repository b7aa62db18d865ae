//! Structured validation outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a signature check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFailure {
    /// No signature attached.
    Missing,
    /// Signature present but does not verify.
    Invalid,
}

impl fmt::Display for SignatureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "License signature is missing",
            Self::Invalid => {
                "License signature verification failed. License may be tampered with."
            }
        })
    }
}

/// A problem that makes a license invalid.
///
/// The `Display` text is the plain-language message shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ValidationError {
    /// Nothing to validate.
    #[error("No license provided")]
    MissingLicense,

    /// Key shape, checksum, dates or flags are wrong.
    #[error("{0}")]
    Format(String),

    /// The license is past its expiration date.
    #[error("{0}")]
    Expired(String),

    /// The license is bound to another machine.
    #[error("License is not valid for this machine. Hardware fingerprint mismatch.")]
    HardwareMismatch,

    /// No hardware trait could be probed on this machine.
    #[error("Unable to generate machine fingerprint")]
    FingerprintUnavailable,

    /// The signature is missing or does not verify.
    #[error("{0}")]
    Signature(SignatureFailure),

    /// A feature is missing, disabled, expired, not allowed, or over a limit.
    #[error("{0}")]
    Entitlement(String),
}

/// A non-fatal observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// The license expires soon.
    #[error("{0}")]
    Expiring(String),
}

/// The combined outcome of one or more validation stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// An empty, valid result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A result holding a single error.
    #[must_use]
    pub fn from_error(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    /// True when no errors were recorded. Warnings do not count.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Appends another result's errors and warnings to this one.
    pub fn combine(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// By-value [`combine`](Self::combine), for folding.
    #[must_use]
    pub fn combined(mut self, other: ValidationResult) -> Self {
        self.combine(other);
        self
    }

    /// Error messages, in recording order.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Warning messages, in recording order.
    #[must_use]
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// One-line summary such as `Valid with 1 warning(s)`.
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.errors.len(), self.warnings.len()) {
            (0, 0) => "Valid".to_string(),
            (0, w) => format!("Valid with {w} warning(s)"),
            (e, 0) => format!("{e} error(s)"),
            (e, w) => format!("{e} error(s), {w} warning(s)"),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return f.write_str("No issues found");
        }

        let mut lines = Vec::new();
        if !self.errors.is_empty() {
            lines.push("ERRORS:".to_string());
            lines.extend(self.errors.iter().map(|e| format!("  - {e}")));
        }
        if !self.warnings.is_empty() {
            lines.push("WARNINGS:".to_string());
            lines.extend(self.warnings.iter().map(|w| format!("  - {w}")));
        }
        f.write_str(&lines.join("\n"))
    }
}
