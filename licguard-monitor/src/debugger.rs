//! Debugger presence probes.
//!
//! Each probe is a cheap boolean signal. None is conclusive: an attached
//! debugger can hide from all of them, and a slow machine can trip the
//! timing heuristic.

use crate::config::MonitorConfig;
use crate::monitor::TrustCheck;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Iterations of the fixed-cost timing loop.
pub const TIMING_ITERATIONS: u64 = 1000;

/// Executable names of common debuggers, unpackers and dumpers.
pub const KNOWN_DEBUGGER_PROCESSES: &[&str] = &[
    "ollydbg",
    "ida",
    "ida64",
    "idag",
    "idag64",
    "idaw",
    "idaw64",
    "idaq",
    "idaq64",
    "idau",
    "idau64",
    "scylla",
    "scylla_x64",
    "scylla_x86",
    "protection_id",
    "x64dbg",
    "x32dbg",
    "windbg",
    "reshacker",
    "ImportREC",
    "IMMUNITYDEBUGGER",
    "MegaDumper",
];

/// Tracers that launch their target as a child.
#[cfg(target_os = "linux")]
const TRACER_PARENTS: &[&str] = &["gdb", "gdbserver", "lldb", "lldb-server", "strace", "ltrace"];

// ── Attached debugger ────────────────────────────────────────────

/// Whether the OS reports a debugger attached to this process.
#[must_use]
pub fn is_debugger_attached() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| tracer_pid(&status))
            .is_some_and(|pid| pid != 0)
    }

    #[cfg(windows)]
    {
        // SAFETY: no arguments; reads the current process environment block.
        unsafe { winapi::um::debugapi::IsDebuggerPresent() != 0 }
    }

    #[cfg(not(any(target_os = "linux", windows)))]
    {
        false
    }
}

/// Extracts `TracerPid` from `/proc/<pid>/status` content.
#[must_use]
pub fn tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}

/// Whether a debugger in another process is attached or is our launcher.
#[must_use]
pub fn is_remote_debugger_present() -> bool {
    #[cfg(target_os = "linux")]
    {
        let ppid = std::os::unix::process::parent_id();
        std::fs::read_to_string(format!("/proc/{ppid}/comm"))
            .map(|comm| is_tracer_name(comm.trim()))
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        use winapi::shared::minwindef::{BOOL, FALSE};
        use winapi::um::debugapi::CheckRemoteDebuggerPresent;
        use winapi::um::processthreadsapi::GetCurrentProcess;

        let mut present: BOOL = FALSE;
        // SAFETY: GetCurrentProcess returns a pseudo-handle that needs no
        // closing, and `present` outlives the call.
        let ok = unsafe { CheckRemoteDebuggerPresent(GetCurrentProcess(), &mut present) };
        ok != 0 && present != 0
    }

    #[cfg(not(any(target_os = "linux", windows)))]
    {
        false
    }
}

#[cfg(target_os = "linux")]
fn is_tracer_name(comm: &str) -> bool {
    TRACER_PARENTS.iter().any(|t| comm.eq_ignore_ascii_case(t))
}

// ── Timing ───────────────────────────────────────────────────────

/// Runs the fixed-cost loop and returns how long it took.
#[must_use]
pub fn timed_loop() -> Duration {
    let start = Instant::now();
    let mut acc: u64 = 0;
    for i in 0..TIMING_ITERATIONS {
        acc = black_box(acc.wrapping_mul(31).wrapping_add(i));
    }
    black_box(acc);
    start.elapsed()
}

/// Whether the fixed-cost loop ran slower than `threshold`.
#[must_use]
pub fn timing_anomaly(threshold: Duration) -> bool {
    timed_loop() > threshold
}

// ── Process scan ─────────────────────────────────────────────────

/// Names of running processes, as reported by the OS.
///
/// Empty when the platform offers no cheap way to list them.
#[must_use]
pub fn running_process_names() -> Vec<String> {
    #[cfg(target_os = "linux")]
    {
        let Ok(entries) = std::fs::read_dir("/proc") else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()))
            })
            .filter_map(|entry| std::fs::read_to_string(entry.path().join("comm")).ok())
            .map(|comm| comm.trim().to_string())
            .collect()
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ps")
            .args(["-axco", "comm="])
            .output()
            .ok()
            .and_then(|out| String::from_utf8(out.stdout).ok())
            .map(|text| text.lines().map(|l| l.trim().to_string()).collect())
            .unwrap_or_default()
    }

    #[cfg(windows)]
    {
        windows_process_names()
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    {
        Vec::new()
    }
}

#[cfg(windows)]
fn windows_process_names() -> Vec<String> {
    use std::mem;
    use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
    use winapi::um::tlhelp32::{
        CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
        TH32CS_SNAPPROCESS,
    };

    let mut names = Vec::new();
    // SAFETY: the snapshot handle is checked and closed, and the entry
    // struct is zeroed with its size field set before use.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
        if snapshot == INVALID_HANDLE_VALUE {
            return names;
        }

        let mut entry: PROCESSENTRY32W = mem::zeroed();
        entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;

        if Process32FirstW(snapshot, &mut entry) != 0 {
            loop {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                names.push(String::from_utf16_lossy(&entry.szExeFile[..len]));
                if Process32NextW(snapshot, &mut entry) == 0 {
                    break;
                }
            }
        }

        CloseHandle(snapshot);
    }
    names
}

/// The first running process whose name matches a known debugger.
///
/// Matching ignores case and a trailing `.exe`.
#[must_use]
pub fn find_debugger_process<S: AsRef<str>>(running: &[String], known: &[S]) -> Option<String> {
    running
        .iter()
        .find(|name| {
            let name = normalize_process_name(name);
            known
                .iter()
                .any(|k| normalize_process_name(k.as_ref()) == name)
        })
        .cloned()
}

fn normalize_process_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

// ── Check ────────────────────────────────────────────────────────

/// All debugger probes as one [`TrustCheck`].
#[derive(Debug, Clone)]
pub struct DebuggerCheck {
    known_processes: Vec<String>,
    timing_threshold: Duration,
}

impl DebuggerCheck {
    pub fn new(known_processes: Vec<String>, timing_threshold: Duration) -> Self {
        Self {
            known_processes,
            timing_threshold,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.debugger_process_names.clone(),
            config.timing_threshold(),
        )
    }
}

impl TrustCheck for DebuggerCheck {
    fn name(&self) -> &'static str {
        "debugger"
    }

    fn findings(&self) -> Vec<String> {
        let mut findings = Vec::new();

        if is_debugger_attached() {
            findings.push("debugger attached".to_string());
        }
        if is_remote_debugger_present() {
            findings.push("remote debugger present".to_string());
        }
        let elapsed = timed_loop();
        if elapsed > self.timing_threshold {
            findings.push(format!("timing loop took {}ms", elapsed.as_millis()));
        }
        if let Some(name) = find_debugger_process(&running_process_names(), &self.known_processes)
        {
            findings.push(format!("debugger process running: {name}"));
        }

        findings
    }
}
