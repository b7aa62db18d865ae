//! File handling and rendering shared by the `licguard` binary.

use anyhow::{Context, Result};
use licguard_crypto::{generate_keypair, PrivateKey, PublicKey};
use licguard_license::{License, ValidationResult};
use licguard_monitor::MonitorConfig;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the vendor signing key written by `keygen`.
pub const PRIVATE_KEY_FILE: &str = "vendor.key";

/// File name of the vendor verifying key written by `keygen`.
pub const PUBLIC_KEY_FILE: &str = "vendor.pub";

/// Generates a vendor key pair into `dir`, returning the written paths as
/// `(private, public)`.
///
/// Refuses to overwrite an existing private key.
pub fn write_keypair(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create key directory {}", dir.display()))?;

    let private_path = dir.join(PRIVATE_KEY_FILE);
    let public_path = dir.join(PUBLIC_KEY_FILE);
    if private_path.exists() {
        anyhow::bail!("Refusing to overwrite {}", private_path.display());
    }

    let (public_key, private_key) = generate_keypair();
    write_secret(&private_path, private_key.to_base64().as_bytes())
        .context("Failed to write private key")?;
    fs::write(&public_path, public_key.to_base64()).context("Failed to write public key")?;

    Ok((private_path, public_path))
}

#[cfg(unix)]
fn write_secret(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_secret(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}

pub fn read_private_key(path: &Path) -> Result<PrivateKey> {
    let encoded = fs::read_to_string(path)
        .with_context(|| format!("Failed to read private key {}", path.display()))?;
    PrivateKey::from_base64(&encoded).context("Failed to decode private key")
}

pub fn read_public_key(path: &Path) -> Result<PublicKey> {
    let encoded = fs::read_to_string(path)
        .with_context(|| format!("Failed to read public key {}", path.display()))?;
    PublicKey::from_base64(&encoded).context("Failed to decode public key")
}

/// Reads a plaintext license JSON file, as produced by `issue --out`.
pub fn read_license(path: &Path) -> Result<License> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read license {}", path.display()))?;
    serde_json::from_str(&json).context("Failed to parse license JSON")
}

/// The signed license as pretty JSON, the form `read_license` accepts.
pub fn license_json(license: &License) -> Result<String> {
    serde_json::to_string_pretty(license).context("Failed to serialize license")
}

pub fn write_license(path: &Path, license: &License) -> Result<()> {
    let json = license_json(license)?;
    fs::write(path, json).with_context(|| format!("Failed to write license {}", path.display()))
}

/// Loads a monitor config file, or the defaults when no path is given.
pub fn load_monitor_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let Some(path) = path else {
        return Ok(MonitorConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read monitor config {}", path.display()))?;
    MonitorConfig::from_json(&json).context("Invalid monitor config")
}

/// Shows only the key's tier prefix; the rest stays off the terminal.
#[must_use]
pub fn mask_key(key: &str) -> String {
    match key.split_once('-') {
        Some((prefix, _)) => format!("{prefix}-****"),
        None => "****".to_string(),
    }
}

/// Human-readable license summary. Never includes the full key or the
/// signature.
#[must_use]
pub fn render_license(license: &License) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Key:        {}", mask_key(&license.key));
    let _ = writeln!(out, "Product:    {}", license.product_name);
    let _ = writeln!(out, "User:       {}", license.user_id);
    let _ = writeln!(out, "Tier:       {}", license.tier.display_name());
    let _ = writeln!(out, "Machine:    {}", license.machine_id);
    let _ = writeln!(out, "Issued:     {}", license.issue_date.to_rfc3339());
    let _ = writeln!(out, "Expires:    {}", license.expiration_date.to_rfc3339());
    let _ = writeln!(out, "Signed:     {}", if license.is_signed() { "yes" } else { "no" });
    let _ = writeln!(out, "Features:");
    for feature in &license.features {
        let state = if feature.enabled { "on" } else { "off" };
        let _ = write!(out, "  - {} ({state})", feature.name);
        if let Some(value) = &feature.value {
            let _ = write!(out, " = {value}");
        }
        if let Some(expires) = feature.expiration_date {
            let _ = write!(out, ", expires {}", expires.to_rfc3339());
        }
        out.push('\n');
    }
    out
}

/// `summary` line followed by the detailed breakdown.
#[must_use]
pub fn render_result(result: &ValidationResult) -> String {
    format!("{}\n{result}", result.summary())
}
