//! Code integrity checks.
//!
//! Three independent signals:
//! - the running executable still hashes to the value captured at startup,
//!   and every file in an optional [`IntegrityManifest`] matches its entry
//! - no injected or writable-executable code shows up in the process
//!   memory map
//! - the executable is not running from a temp, sandbox or VM-looking path

use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::monitor::TrustCheck;
use licguard_crypto::{hash_file, secure_compare_str, sha256_hex};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Path segments that suggest analysis or throwaway environments.
pub const SUSPICIOUS_PATH_SEGMENTS: &[&str] = &[
    "temp", "tmp", "debug", "analysis", "sandbox", "virtual", "vm", "vbox",
];

/// Memory-map names left behind by common instrumentation frameworks.
pub const INJECTION_MARKERS: &[&str] = &["frida", "gum-js-loop", "gadget", "linjector", "xposed"];

/// Environment variables that preload foreign code.
pub const PRELOAD_VARIABLES: &[&str] = &["LD_PRELOAD", "DYLD_INSERT_LIBRARIES"];

// ── Checksums ────────────────────────────────────────────────────

/// Whether `data` hashes to `expected` (hex SHA-256, any case).
#[must_use]
pub fn verify_checksum(data: &[u8], expected: &str) -> bool {
    secure_compare_str(&sha256_hex(data), &expected.trim().to_ascii_lowercase())
}

// ── Manifest ─────────────────────────────────────────────────────

/// Expected hash of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative to the manifest's base directory, or absolute.
    pub path: PathBuf,
    /// Hex SHA-256.
    pub sha256: String,
}

/// A file in the manifest that no longer matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// The file could not be read.
    Missing(PathBuf),
    /// The file's hash changed.
    Modified(PathBuf),
}

/// A versioned list of expected file hashes, produced at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub version: u32,
    pub entries: Vec<ManifestEntry>,
}

impl IntegrityManifest {
    /// Hashes `files`, recording paths relative to `base` where possible.
    pub fn generate(base: &Path, files: &[PathBuf]) -> MonitorResult<Self> {
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let full = if file.is_absolute() {
                file.clone()
            } else {
                base.join(file)
            };
            let sha256 = hash_file(&full)?;
            let path = full
                .strip_prefix(base)
                .map(Path::to_path_buf)
                .unwrap_or(full.clone());
            entries.push(ManifestEntry { path, sha256 });
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            entries,
        })
    }

    /// Reads a manifest from JSON.
    pub fn load(path: &Path) -> MonitorResult<Self> {
        let manifest: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(MonitorError::UnsupportedManifestVersion(manifest.version));
        }
        Ok(manifest)
    }

    /// Writes the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> MonitorResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Re-hashes every entry, resolving relative paths against `base`.
    #[must_use]
    pub fn verify(&self, base: &Path) -> Vec<IntegrityViolation> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let full = base.join(&entry.path);
                match hash_file(&full) {
                    Ok(actual) if secure_compare_str(&actual, &entry.sha256) => None,
                    Ok(_) => Some(IntegrityViolation::Modified(entry.path.clone())),
                    Err(_) => Some(IntegrityViolation::Missing(entry.path.clone())),
                }
            })
            .collect()
    }
}

// ── Memory map scan ──────────────────────────────────────────────

/// Suspicious lines in `/proc/<pid>/maps` content: writable and executable
/// mappings, and mappings named after injection frameworks.
#[must_use]
pub fn scan_maps(maps: &str) -> Vec<String> {
    maps.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let perms = fields.nth(1)?;
            let name = line.split_whitespace().nth(5).unwrap_or("").to_ascii_lowercase();

            if perms.starts_with("rwx") {
                Some(format!("writable executable mapping {}", line.trim()))
            } else if INJECTION_MARKERS.iter().any(|m| name.contains(m)) {
                Some(format!("injected module {name}"))
            } else {
                None
            }
        })
        .collect()
}

/// Tampering markers in this process: preload variables and, on Linux,
/// the memory map scan.
#[must_use]
pub fn scan_process() -> Vec<String> {
    let mut findings: Vec<String> = PRELOAD_VARIABLES
        .iter()
        .filter(|var| env::var_os(var).is_some_and(|v| !v.is_empty()))
        .map(|var| format!("{var} is set"))
        .collect();

    #[cfg(target_os = "linux")]
    {
        if let Ok(maps) = fs::read_to_string("/proc/self/maps") {
            findings.extend(scan_maps(&maps));
        }
    }

    findings
}

// ── Location ─────────────────────────────────────────────────────

/// Whether `path` sits under the temp directory or has a component that
/// names a temp, debug, analysis, sandbox or VM location.
#[must_use]
pub fn is_suspicious_location(path: &Path) -> bool {
    if path.starts_with(env::temp_dir()) {
        return true;
    }
    path.components().any(|component| {
        let segment = component.as_os_str().to_string_lossy().to_ascii_lowercase();
        SUSPICIOUS_PATH_SEGMENTS.iter().any(|s| segment == *s)
    })
}

// ── Check ────────────────────────────────────────────────────────

/// Executable hash, manifest, memory and location checks as one
/// [`TrustCheck`].
#[derive(Debug, Clone)]
pub struct IntegrityCheck {
    executable: Option<PathBuf>,
    /// Hash of the executable captured when the check was created.
    baseline: Option<String>,
    manifest: Option<(IntegrityManifest, PathBuf)>,
    scan_memory: bool,
    check_location: bool,
}

impl IntegrityCheck {
    /// Captures the baseline hash of `executable` now.
    pub fn for_executable(executable: PathBuf) -> Self {
        Self {
            baseline: capture_baseline(&executable),
            executable: Some(executable),
            manifest: None,
            scan_memory: true,
            check_location: false,
        }
    }

    /// The checks `config` enables, with a baseline for the running
    /// executable taken now.
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        let executable = env::current_exe()
            .inspect_err(|e| warn!(error = %e, "current executable path unavailable"))
            .ok();

        let mut check = Self {
            executable,
            baseline: None,
            manifest: None,
            scan_memory: config.check_integrity,
            check_location: config.check_location,
        };
        if config.check_integrity {
            check.baseline = check.executable.as_deref().and_then(capture_baseline);
            if let Some(path) = &config.manifest_path {
                check.manifest = Some((IntegrityManifest::load(path)?, manifest_base(path)));
            }
        }
        Ok(check)
    }

    /// Also verifies `manifest`, resolving relative entries against `base`.
    #[must_use]
    pub fn with_manifest(mut self, manifest: IntegrityManifest, base: PathBuf) -> Self {
        self.manifest = Some((manifest, base));
        self
    }

    #[must_use]
    pub fn with_location_check(mut self, enabled: bool) -> Self {
        self.check_location = enabled;
        self
    }

    #[must_use]
    pub fn with_memory_scan(mut self, enabled: bool) -> Self {
        self.scan_memory = enabled;
        self
    }

    /// The hash captured at construction.
    #[must_use]
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }
}

fn capture_baseline(executable: &Path) -> Option<String> {
    hash_file(executable)
        .inspect_err(|e| warn!(error = %e, "cannot hash executable; skipping baseline comparison"))
        .ok()
}

fn manifest_base(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

impl TrustCheck for IntegrityCheck {
    fn name(&self) -> &'static str {
        "integrity"
    }

    fn findings(&self) -> Vec<String> {
        let mut findings = Vec::new();

        if let (Some(exe), Some(baseline)) = (&self.executable, &self.baseline) {
            match hash_file(exe) {
                Ok(current) if secure_compare_str(&current, baseline) => {}
                Ok(_) => findings.push("executable hash changed".to_string()),
                Err(e) => findings.push(format!("executable unreadable: {e}")),
            }
        }

        if let Some((manifest, base)) = &self.manifest {
            findings.extend(manifest.verify(base).into_iter().map(|v| match v {
                IntegrityViolation::Missing(path) => format!("missing {}", path.display()),
                IntegrityViolation::Modified(path) => format!("modified {}", path.display()),
            }));
        }

        if self.scan_memory {
            findings.extend(scan_process());
        }

        if self.check_location
            && let Some(exe) = &self.executable
            && is_suspicious_location(exe)
        {
            findings.push(format!("running from {}", exe.display()));
        }

        debug!(count = findings.len(), "integrity check finished");
        findings
    }
}
