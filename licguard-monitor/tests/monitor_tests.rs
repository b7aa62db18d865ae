use licguard_monitor::{
    CheckReport, FailurePolicy, Finding, MonitorConfig, MonitorState, TrustCheck, TrustMonitor,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// A check whose verdict the test controls, counting how often it runs.
#[derive(Clone, Default)]
struct Switch {
    tripped: Arc<AtomicBool>,
    runs: Arc<AtomicUsize>,
}

impl Switch {
    fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl TrustCheck for Switch {
    fn name(&self) -> &'static str {
        "switch"
    }

    fn findings(&self) -> Vec<String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.tripped.load(Ordering::SeqCst) {
            vec!["tripped".to_string()]
        } else {
            Vec::new()
        }
    }
}

struct AlwaysClean;

impl TrustCheck for AlwaysClean {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn findings(&self) -> Vec<String> {
        Vec::new()
    }
}

fn fail_open(interval_ms: u64) -> TrustMonitor {
    TrustMonitor::new(FailurePolicy::FailOpen, Duration::from_millis(interval_ms))
}

const WAIT: Duration = Duration::from_secs(5);

// ── Single round ─────────────────────────────────────────────────

#[test]
fn starts_idle() {
    assert_eq!(fail_open(100).state(), MonitorState::Idle);
}

#[test]
fn clean_round() {
    let monitor = fail_open(100).with_check(AlwaysClean).with_check(Switch::default());
    let report = monitor.evaluate();
    assert_eq!(report, CheckReport::default());
    assert_eq!(monitor.state(), MonitorState::Clean);
}

#[test]
fn any_finding_compromises() {
    let switch = Switch::default();
    switch.trip();
    let monitor = fail_open(100).with_check(AlwaysClean).with_check(switch);

    let report = monitor.evaluate();
    assert!(report.is_compromised());
    assert_eq!(
        report.findings,
        vec![Finding {
            check: "switch",
            detail: "tripped".to_string()
        }]
    );
    assert_eq!(monitor.state(), MonitorState::Compromised);
}

#[test]
fn fail_open_check_once_returns() {
    let switch = Switch::default();
    let monitor = fail_open(100).with_check(switch.clone());
    assert_eq!(monitor.check_once(), MonitorState::Clean);

    switch.trip();
    assert_eq!(monitor.check_once(), MonitorState::Compromised);
    assert_eq!(switch.runs(), 2);
}

#[test]
fn state_recovers_after_clean_round() {
    let switch = Switch::default();
    switch.trip();
    let monitor = fail_open(100).with_check(switch.clone());
    monitor.evaluate();
    assert_eq!(monitor.state(), MonitorState::Compromised);

    switch.tripped.store(false, Ordering::SeqCst);
    monitor.evaluate();
    assert_eq!(monitor.state(), MonitorState::Clean);
}

#[test]
fn no_checks_is_clean() {
    assert_eq!(fail_open(100).check_once(), MonitorState::Clean);
}

#[test]
fn from_config_registers_enabled_checks() {
    let config = MonitorConfig {
        policy: FailurePolicy::FailOpen,
        ..MonitorConfig::default()
    };
    let monitor = TrustMonitor::from_config(&config).unwrap();
    assert_eq!(monitor.check_names(), vec!["debugger", "integrity"]);
    assert_eq!(monitor.policy(), FailurePolicy::FailOpen);

    let none = MonitorConfig {
        check_debugger: false,
        check_integrity: false,
        ..config
    };
    assert!(TrustMonitor::from_config(&none).unwrap().check_names().is_empty());
}

#[test]
fn from_config_rejects_invalid() {
    let config = MonitorConfig {
        interval_ms: 0,
        ..MonitorConfig::default()
    };
    assert!(TrustMonitor::from_config(&config).is_err());
}

// ── Background task ──────────────────────────────────────────────

#[tokio::test]
async fn spawned_monitor_reports_state() {
    let switch = Switch::default();
    let handle = fail_open(10)
        .with_check(switch.clone())
        .spawn(CancellationToken::new());

    let mut rx = handle.subscribe();
    timeout(WAIT, rx.wait_for(|s| *s == MonitorState::Clean))
        .await
        .expect("clean round")
        .unwrap();

    switch.trip();
    timeout(WAIT, rx.wait_for(|s| *s == MonitorState::Compromised))
        .await
        .expect("compromised round")
        .unwrap();
    assert_eq!(handle.state(), MonitorState::Compromised);

    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_checks() {
    let switch = Switch::default();
    let handle = fail_open(10)
        .with_check(switch.clone())
        .spawn(CancellationToken::new());

    timeout(WAIT, async {
        while switch.runs() < 2 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    handle.shutdown().await;
    let after = switch.runs();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(switch.runs(), after);
}

#[tokio::test]
async fn parent_cancellation_stops_task() {
    let parent = CancellationToken::new();
    let handle = fail_open(10).with_check(AlwaysClean).spawn(parent.clone());

    parent.cancel();
    timeout(WAIT, async {
        while !handle.is_finished() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn handle_drop_stops_task() {
    let switch = Switch::default();
    let handle = fail_open(10)
        .with_check(switch.clone())
        .spawn(CancellationToken::new());

    timeout(WAIT, async {
        while switch.runs() < 1 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    drop(handle);
    sleep(Duration::from_millis(50)).await;
    let after = switch.runs();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(switch.runs(), after);
}

#[tokio::test]
async fn shutdown_does_not_cancel_parent() {
    let parent = CancellationToken::new();
    let handle = fail_open(10).spawn(parent.clone());
    handle.shutdown().await;
    assert!(!parent.is_cancelled());
}
