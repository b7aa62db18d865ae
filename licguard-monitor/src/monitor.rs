//! The periodic trust monitor.
//!
//! Each round moves the state `Idle/Clean → Checking → Clean | Compromised`.
//! A compromised round is handled by the [`FailurePolicy`]: fail-closed
//! terminates the process, fail-open only logs.

use crate::config::{FailurePolicy, MonitorConfig};
use crate::debugger::DebuggerCheck;
use crate::error::MonitorResult;
use crate::integrity::IntegrityCheck;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where the monitor is in its check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// No round has run yet.
    Idle,
    /// A round is in progress.
    Checking,
    /// The last round found nothing.
    Clean,
    /// The last round found evidence of tampering or debugging.
    Compromised,
}

/// One independent trust probe.
pub trait TrustCheck: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reasons to consider the process compromised. Empty when clean.
    fn findings(&self) -> Vec<String>;
}

/// A single finding, tagged with the check that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub check: &'static str,
    pub detail: String,
}

/// Outcome of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub findings: Vec<Finding>,
}

impl CheckReport {
    /// Checks are combined with OR: any finding compromises the process.
    #[must_use]
    pub fn is_compromised(&self) -> bool {
        !self.findings.is_empty()
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        if self.is_compromised() {
            MonitorState::Compromised
        } else {
            MonitorState::Clean
        }
    }
}

/// Runs trust checks once or on a schedule.
pub struct TrustMonitor {
    checks: Vec<Box<dyn TrustCheck>>,
    policy: FailurePolicy,
    interval: Duration,
    state: watch::Sender<MonitorState>,
}

impl TrustMonitor {
    /// A monitor with no checks.
    pub fn new(policy: FailurePolicy, interval: Duration) -> Self {
        let (state, _) = watch::channel(MonitorState::Idle);
        Self {
            checks: Vec::new(),
            policy,
            interval,
            state,
        }
    }

    /// A monitor with the debugger and integrity checks `config` enables.
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        config.validate()?;
        let mut monitor = Self::new(config.policy, config.interval());
        if config.check_debugger {
            monitor = monitor.with_check(DebuggerCheck::from_config(config));
        }
        if config.check_integrity || config.check_location {
            monitor = monitor.with_check(IntegrityCheck::from_config(config)?);
        }
        Ok(monitor)
    }

    /// Adds a check.
    #[must_use]
    pub fn with_check(mut self, check: impl TrustCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Names of the registered checks.
    #[must_use]
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    #[must_use]
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// The state after the most recent round.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Watches state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    /// Runs every check once and records the resulting state, without
    /// applying the failure policy.
    pub fn evaluate(&self) -> CheckReport {
        self.transition(MonitorState::Checking);

        let findings = self
            .checks
            .iter()
            .flat_map(|check| {
                let name = check.name();
                check
                    .findings()
                    .into_iter()
                    .map(move |detail| Finding { check: name, detail })
            })
            .collect();
        let report = CheckReport { findings };

        self.transition(report.state());
        report
    }

    /// Runs every check once and applies the failure policy.
    ///
    /// Under fail-closed a compromised round does not return.
    pub fn check_once(&self) -> MonitorState {
        let report = self.evaluate();
        if report.is_compromised() {
            self.enforce(&report);
        }
        report.state()
    }

    fn enforce(&self, report: &CheckReport) {
        for finding in &report.findings {
            match self.policy {
                FailurePolicy::FailClosed { .. } => {
                    error!(check = finding.check, detail = %finding.detail, "trust check failed")
                }
                FailurePolicy::FailOpen => {
                    warn!(check = finding.check, detail = %finding.detail, "trust check failed")
                }
            }
        }

        if let FailurePolicy::FailClosed { exit_code } = self.policy {
            error!(exit_code, "process is compromised; terminating");
            std::process::exit(exit_code);
        }
    }

    fn transition(&self, next: MonitorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "monitor state changed");
        }
    }

    /// Runs rounds every interval until `cancel` fires.
    ///
    /// Checks run on the blocking pool so slow probes do not stall the
    /// runtime.
    pub async fn run(self, cancel: CancellationToken) {
        let monitor = Arc::new(self);
        let mut ticker = interval(monitor.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_ms = monitor.interval.as_millis() as u64,
            checks = ?monitor.check_names(),
            policy = ?monitor.policy,
            "trust monitor started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("trust monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let round = Arc::clone(&monitor);
                    if let Err(e) = tokio::task::spawn_blocking(move || round.check_once()).await {
                        warn!(error = %e, "trust check round panicked");
                    }
                }
            }
        }
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    ///
    /// The task stops when `cancel` fires, when the handle is shut down, or
    /// when the handle is dropped.
    pub fn spawn(self, cancel: CancellationToken) -> MonitorHandle {
        let cancel = cancel.child_token();
        let state = self.subscribe();
        let task = tokio::spawn(self.run(cancel.clone()));
        MonitorHandle {
            cancel,
            state,
            task: Some(task),
        }
    }
}

/// Owner of a running monitor task.
pub struct MonitorHandle {
    cancel: CancellationToken,
    state: watch::Receiver<MonitorState>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// The state after the most recent round.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Watches state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops issuing checks and waits for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "trust monitor task failed");
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
