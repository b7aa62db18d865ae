//! Runtime trust monitoring for licguard.
//!
//! Two families of checks, combined with OR into a single verdict:
//! - debugger presence: OS attach flags, remote debuggers, a timing
//!   heuristic and a scan for known debugger processes
//! - integrity: executable hash against a startup baseline, an optional
//!   build-time file manifest, memory-map injection markers and a
//!   suspicious-location check
//!
//! These raise the cost of casual tampering. They are not a security
//! boundary: anyone controlling the machine can defeat every one of them.
//!
//! The monitor runs as a tokio task owned through a [`MonitorHandle`] and
//! stops when its cancellation token fires or the handle is dropped.

mod config;
mod debugger;
mod error;
mod integrity;
mod monitor;

pub use config::{FailurePolicy, MonitorConfig, DEFAULT_EXIT_CODE};
pub use debugger::{
    find_debugger_process, is_debugger_attached, is_remote_debugger_present,
    running_process_names, timed_loop, timing_anomaly, tracer_pid, DebuggerCheck,
    KNOWN_DEBUGGER_PROCESSES, TIMING_ITERATIONS,
};
pub use error::{MonitorError, MonitorResult};
pub use integrity::{
    is_suspicious_location, scan_maps, scan_process, verify_checksum, IntegrityCheck,
    IntegrityManifest, IntegrityViolation, ManifestEntry, INJECTION_MARKERS, MANIFEST_VERSION,
    PRELOAD_VARIABLES, SUSPICIOUS_PATH_SEGMENTS,
};
pub use monitor::{CheckReport, Finding, MonitorHandle, MonitorState, TrustCheck, TrustMonitor};
