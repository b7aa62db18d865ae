//! Monitor configuration.

use crate::debugger::KNOWN_DEBUGGER_PROCESSES;
use crate::error::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default exit code under fail-closed.
pub const DEFAULT_EXIT_CODE: i32 = 2;

/// What happens when a check reports the process as compromised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log and terminate the process with `exit_code`.
    FailClosed { exit_code: i32 },
    /// Log only. For debugging and diagnostics.
    FailOpen,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::FailClosed {
            exit_code: DEFAULT_EXIT_CODE,
        }
    }
}

/// Trust monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Time between check rounds.
    pub interval_ms: u64,
    pub policy: FailurePolicy,
    /// A 1000-iteration loop slower than this suggests single-stepping.
    pub timing_threshold_ms: u64,
    pub check_debugger: bool,
    pub check_integrity: bool,
    /// Flag temp, sandbox and VM-looking install paths. Off by default
    /// because development builds live under `target/debug`.
    pub check_location: bool,
    /// Process names treated as debuggers, matched case-insensitively.
    pub debugger_process_names: Vec<String>,
    /// Optional file manifest to verify each round.
    pub manifest_path: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            policy: FailurePolicy::default(),
            timing_threshold_ms: 10,
            check_debugger: true,
            check_integrity: true,
            check_location: false,
            debugger_process_names: KNOWN_DEBUGGER_PROCESSES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            manifest_path: None,
        }
    }
}

impl MonitorConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> MonitorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the monitor cannot run with.
    pub fn validate(&self) -> MonitorResult<()> {
        if self.interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.timing_threshold_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "timing_threshold_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn timing_threshold(&self) -> Duration {
        Duration::from_millis(self.timing_threshold_ms)
    }
}
