//! Machine fingerprinting for license binding.
//!
//! A fingerprint is the SHA-256 of the stable hardware and OS traits that
//! could be read on this machine, joined with `|`. Each trait comes from a
//! [`HardwareProbe`]; a probe that cannot answer returns [`Unavailable`] and
//! the trait is left out instead of failing the whole computation.
//!
//! Hardware binding is a best-effort deterrent. Every trait here can be
//! spoofed by a determined user, and legitimate hardware or OS changes will
//! alter the fingerprint.

use licguard_crypto::sha256_hex;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::{debug, warn};

/// Length of the compact machine id.
pub const MACHINE_ID_LEN: usize = 16;

/// Returned when no probe could read anything.
pub const UNKNOWN_MACHINE: &str = "UNKNOWN_MACHINE";

/// Maximum number of MAC addresses folded into the fingerprint.
pub const MAX_MAC_ADDRESSES: usize = 3;

/// Manufacturer/model fragments that indicate a virtual machine.
pub const VIRTUALIZATION_VENDORS: &[&str] = &[
    "VBOX",
    "VIRTUALBOX",
    "VMWARE",
    "VIRTUAL",
    "XEN",
    "QEMU",
    "KVM",
    "HYPER-V",
    "PARALLELS",
    "BOCHS",
];

/// A hardware trait could not be read on this platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Unavailable(pub String);

impl Unavailable {
    #[cfg_attr(target_os = "linux", allow(dead_code))]
    fn unsupported() -> Self {
        Self("not supported on this platform".to_string())
    }
}

/// One source of a stable machine trait.
pub trait HardwareProbe: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reads the trait.
    fn probe(&self) -> Result<String, Unavailable>;
}

/// Outcome of running one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub name: &'static str,
    pub result: Result<String, Unavailable>,
}

/// A computed fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineFingerprint {
    /// Hex SHA-256 of the joined traits, or [`UNKNOWN_MACHINE`].
    fingerprint: String,
    /// Names of the probes that contributed.
    components: Vec<String>,
}

impl MachineFingerprint {
    /// The full fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The first [`MACHINE_ID_LEN`] characters of the fingerprint.
    #[must_use]
    pub fn machine_id(&self) -> &str {
        let end = self.fingerprint.len().min(MACHINE_ID_LEN);
        &self.fingerprint[..end]
    }

    /// Names of the probes that contributed.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// True when no probe succeeded and binding falls back to the sentinel.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.components.is_empty()
    }
}

/// Composes probes into a fingerprint.
pub struct Fingerprinter {
    probes: Vec<Box<dyn HardwareProbe>>,
}

impl Fingerprinter {
    /// Uses the given probes, in order.
    pub fn with_probes(probes: Vec<Box<dyn HardwareProbe>>) -> Self {
        Self { probes }
    }

    /// Uses the probes for the current platform.
    pub fn system() -> Self {
        Self::with_probes(vec![
            Box::new(ProcessorProbe),
            Box::new(PlatformIdProbe),
            Box::new(MacAddressProbe),
            Box::new(HostnameProbe),
            Box::new(OsVersionProbe),
        ])
    }

    /// Runs every probe.
    pub fn collect(&self) -> Vec<ProbeOutcome> {
        self.probes
            .iter()
            .map(|probe| ProbeOutcome {
                name: probe.name(),
                result: probe.probe(),
            })
            .collect()
    }

    /// Computes the fingerprint from whichever traits are available.
    ///
    /// Deterministic for a fixed set of probe answers, so repeated calls in
    /// one session agree.
    pub fn compute(&self) -> MachineFingerprint {
        let mut values = Vec::new();
        let mut components = Vec::new();

        for outcome in self.collect() {
            match outcome.result {
                Ok(value) if !value.trim().is_empty() => {
                    values.push(value);
                    components.push(outcome.name.to_string());
                }
                Ok(_) => debug!(probe = outcome.name, "probe returned an empty value"),
                Err(reason) => debug!(probe = outcome.name, %reason, "probe unavailable"),
            }
        }

        if values.is_empty() {
            warn!("no hardware traits available; hardware binding is degraded");
            return MachineFingerprint {
                fingerprint: UNKNOWN_MACHINE.to_string(),
                components,
            };
        }

        MachineFingerprint {
            fingerprint: sha256_hex(values.join("|").as_bytes()),
            components,
        }
    }

    /// The full fingerprint string.
    pub fn compute_fingerprint(&self) -> String {
        self.compute().fingerprint
    }

    /// The compact machine id.
    pub fn compute_id(&self) -> String {
        self.compute().machine_id().to_string()
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::system()
    }
}

// ── Probes ───────────────────────────────────────────────────────

/// CPU model or serial.
pub struct ProcessorProbe;

impl HardwareProbe for ProcessorProbe {
    fn name(&self) -> &'static str {
        "processor"
    }

    fn probe(&self) -> Result<String, Unavailable> {
        #[cfg(target_os = "linux")]
        {
            let cpuinfo = std::fs::read_to_string("/proc/cpuinfo")
                .map_err(|e| Unavailable(e.to_string()))?;
            ["Serial", "model name", "Hardware", "cpu model"]
                .iter()
                .find_map(|field| cpuinfo_field(&cpuinfo, field))
                .ok_or_else(|| Unavailable("no identifying field in /proc/cpuinfo".to_string()))
        }

        #[cfg(target_os = "macos")]
        {
            command_output("sysctl", &["-n", "machdep.cpu.brand_string"])
        }

        #[cfg(target_os = "windows")]
        {
            env::var("PROCESSOR_IDENTIFIER").map_err(|e| Unavailable(e.to_string()))
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            Err(Unavailable::unsupported())
        }
    }
}

/// Platform UUID (machine-id, IOPlatformUUID or MachineGuid).
pub struct PlatformIdProbe;

impl HardwareProbe for PlatformIdProbe {
    fn name(&self) -> &'static str {
        "platform_id"
    }

    fn probe(&self) -> Result<String, Unavailable> {
        match machine_uid::get() {
            Ok(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            Ok(_) => Err(Unavailable("empty platform id".to_string())),
            Err(e) => {
                #[cfg(target_os = "linux")]
                {
                    std::fs::read_to_string("/sys/class/dmi/id/product_uuid")
                        .map(|s| s.trim().to_string())
                        .map_err(|_| Unavailable(e.to_string()))
                }

                #[cfg(not(target_os = "linux"))]
                {
                    Err(Unavailable(e.to_string()))
                }
            }
        }
    }
}

/// Sorted MAC addresses of physical interfaces, at most three.
pub struct MacAddressProbe;

impl HardwareProbe for MacAddressProbe {
    fn name(&self) -> &'static str {
        "mac_addresses"
    }

    fn probe(&self) -> Result<String, Unavailable> {
        #[cfg(target_os = "linux")]
        {
            let entries = std::fs::read_dir("/sys/class/net")
                .map_err(|e| Unavailable(e.to_string()))?;

            let mut macs = Vec::new();
            for entry in entries.flatten() {
                let iface = entry.path();
                // Virtual interfaces (lo, docker0, veth*) have no backing device.
                if !iface.join("device").exists() {
                    continue;
                }
                if let Ok(addr) = std::fs::read_to_string(iface.join("address")) {
                    let addr = addr.trim().to_ascii_uppercase();
                    if !addr.is_empty() && addr != "00:00:00:00:00:00" {
                        macs.push(addr);
                    }
                }
            }

            join_macs(macs).ok_or_else(|| Unavailable("no physical interfaces".to_string()))
        }

        #[cfg(not(target_os = "linux"))]
        {
            Err(Unavailable::unsupported())
        }
    }
}

/// Machine hostname.
pub struct HostnameProbe;

impl HardwareProbe for HostnameProbe {
    fn name(&self) -> &'static str {
        "hostname"
    }

    fn probe(&self) -> Result<String, Unavailable> {
        hostname::get()
            .map_err(|e| Unavailable(e.to_string()))?
            .into_string()
            .map_err(|_| Unavailable("hostname is not valid UTF-8".to_string()))
    }
}

/// OS name and version.
pub struct OsVersionProbe;

impl HardwareProbe for OsVersionProbe {
    fn name(&self) -> &'static str {
        "os_version"
    }

    fn probe(&self) -> Result<String, Unavailable> {
        let version = os_version()?;
        Ok(format!("{} {}", env::consts::OS, version))
    }
}

fn os_version() -> Result<String, Unavailable> {
    #[cfg(target_os = "macos")]
    {
        command_output("sw_vers", &["-productVersion"])
    }

    #[cfg(target_os = "windows")]
    {
        command_output("cmd", &["/C", "ver"])
    }

    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/etc/os-release")
            .map_err(|e| Unavailable(e.to_string()))?;
        content
            .lines()
            .find(|l| l.starts_with("VERSION_ID="))
            .map(|l| {
                l.trim_start_matches("VERSION_ID=")
                    .trim_matches('"')
                    .to_string()
            })
            .ok_or_else(|| Unavailable("VERSION_ID missing from /etc/os-release".to_string()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        Err(Unavailable::unsupported())
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn command_output(program: &str, args: &[&str]) -> Result<String, Unavailable> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Unavailable(e.to_string()))?;
    let text = String::from_utf8(output.stdout)
        .map_err(|_| Unavailable(format!("{program} produced non-UTF-8 output")))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(Unavailable(format!("{program} produced no output")));
    }
    Ok(text.to_string())
}

#[cfg(target_os = "linux")]
fn cpuinfo_field(cpuinfo: &str, field: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == field)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Sorts, truncates to [`MAX_MAC_ADDRESSES`] and joins with `,`.
///
/// `None` when there is nothing to join.
#[must_use]
pub fn join_macs(mut macs: Vec<String>) -> Option<String> {
    macs.sort();
    macs.dedup();
    macs.truncate(MAX_MAC_ADDRESSES);
    (!macs.is_empty()).then(|| macs.join(","))
}

// ── Virtualization ───────────────────────────────────────────────

/// Whether any of `descriptors` (manufacturer, model, BIOS vendor...) names
/// a known virtualization vendor.
#[must_use]
pub fn matches_virtualization_vendor<S: AsRef<str>>(descriptors: &[S]) -> bool {
    descriptors.iter().any(|d| {
        let upper = d.as_ref().to_ascii_uppercase();
        VIRTUALIZATION_VENDORS.iter().any(|v| upper.contains(v))
    })
}

/// Advisory guess at whether this process runs inside a virtual machine.
///
/// Matches firmware-reported manufacturer and model strings. False negatives
/// are expected; never gate anything important on this alone.
#[must_use]
pub fn is_virtualized_environment() -> bool {
    let descriptors = virtualization_descriptors();
    let detected = matches_virtualization_vendor(&descriptors);
    if detected {
        debug!("virtualization vendor string detected");
    }
    detected
}

fn virtualization_descriptors() -> Vec<String> {
    #[cfg(target_os = "linux")]
    {
        ["sys_vendor", "product_name", "board_vendor", "bios_vendor"]
            .iter()
            .filter_map(|f| std::fs::read_to_string(format!("/sys/class/dmi/id/{f}")).ok())
            .map(|s| s.trim().to_string())
            .collect()
    }

    #[cfg(target_os = "macos")]
    {
        command_output("sysctl", &["-n", "hw.model"])
            .into_iter()
            .collect()
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Vec::new()
    }
}
