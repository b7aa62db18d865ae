//! licguard command-line tool
//!
//! Vendor side:
//!   licguard keygen --dir keys/
//!   licguard issue --key keys/vendor.key --tier premium --user alice --product App --out alice.lic
//!   licguard manifest --base dist/ --out dist/manifest.json dist/app dist/libcore.so
//!
//! Customer side:
//!   licguard fingerprint
//!   licguard validate --public-key vendor.pub --license alice.lic --install
//!   licguard show
//!   licguard monitor --config monitor.json

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use licguard_cli::{
    license_json, load_monitor_config, read_license, read_private_key, read_public_key,
    render_license, render_result, write_keypair, write_license,
};
use licguard_license::{
    is_virtualized_environment, Fingerprinter, LicenseIssuer, LicenseValidator,
};
use licguard_monitor::{IntegrityManifest, MonitorState, TrustMonitor};
use licguard_store::{LicenseStore, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding a `tracing` filter, e.g. `licguard_store=debug`.
const LOG_ENV: &str = "LICGUARD_LOG";

#[derive(Parser, Debug)]
#[command(name = "licguard")]
#[command(about = "Issue, validate and store machine-bound licenses")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// License file used by the local store
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a vendor signing key pair
    Keygen {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Print this machine's id
    Fingerprint,

    /// Issue and sign a license
    Issue {
        /// Vendor private key file
        #[arg(long)]
        key: PathBuf,

        /// Tier name (trial, premium)
        #[arg(long, default_value = "trial")]
        tier: String,

        /// Machine id to bind to; defaults to this machine
        #[arg(long)]
        machine_id: Option<String>,

        #[arg(long)]
        user: String,

        #[arg(long)]
        product: String,

        /// Expiration as RFC 3339; defaults to the tier's duration
        #[arg(long)]
        expires: Option<DateTime<Utc>>,

        /// Write the signed license as JSON here instead of to stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate a license against this machine
    Validate {
        /// Vendor public key file
        #[arg(long)]
        public_key: PathBuf,

        /// License JSON file; defaults to the stored license
        #[arg(long)]
        license: Option<PathBuf>,

        #[arg(long)]
        skip_signature: bool,

        /// Also check a single feature
        #[arg(long)]
        feature: Option<String>,

        /// Persist the license to the local store when it validates
        #[arg(long)]
        install: bool,
    },

    /// Show the stored license
    Show,

    /// Securely delete the stored license
    Delete,

    /// Hash files into an integrity manifest
    Manifest {
        /// Directory manifest paths are relative to
        #[arg(long)]
        base: PathBuf,

        #[arg(long)]
        out: PathBuf,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run the trust monitor until interrupted
    Monitor {
        /// Monitor config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run a single round, print findings and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let store_config = StoreConfig {
        path: args.store_path,
    };

    match args.command {
        Command::Keygen { dir } => keygen(dir),
        Command::Fingerprint => fingerprint(),
        Command::Issue {
            key,
            tier,
            machine_id,
            user,
            product,
            expires,
            out,
        } => issue(key, &tier, machine_id, &user, &product, expires, out),
        Command::Validate {
            public_key,
            license,
            skip_signature,
            feature,
            install,
        } => validate(
            &store_config,
            public_key,
            license,
            skip_signature,
            feature,
            install,
        ),
        Command::Show => show(&store_config),
        Command::Delete => delete(&store_config),
        Command::Manifest { base, out, files } => manifest(base, out, &files),
        Command::Monitor { config, once } => monitor(config, once).await,
    }
}

fn keygen(dir: PathBuf) -> Result<ExitCode> {
    let (private_path, public_path) = write_keypair(&dir)?;
    println!("Private key: {}", private_path.display());
    println!("Public key:  {}", public_path.display());
    println!("\nKeep the private key off customer machines.");
    Ok(ExitCode::SUCCESS)
}

fn fingerprint() -> Result<ExitCode> {
    let fingerprint = Fingerprinter::system().compute();
    if fingerprint.is_degraded() {
        println!("Machine ID: unavailable (no hardware traits could be read)");
        return Ok(ExitCode::FAILURE);
    }
    println!("Machine ID:  {}", fingerprint.machine_id());
    println!("Traits:      {}", fingerprint.components().join(", "));
    if is_virtualized_environment() {
        println!("Note: running in a virtual machine; the id may change with the host.");
    }
    Ok(ExitCode::SUCCESS)
}

fn issue(
    key: PathBuf,
    tier: &str,
    machine_id: Option<String>,
    user: &str,
    product: &str,
    expires: Option<DateTime<Utc>>,
    out: Option<PathBuf>,
) -> Result<ExitCode> {
    let issuer = LicenseIssuer::new(read_private_key(&key)?);
    let machine_id = match machine_id {
        Some(id) => id,
        None => {
            let fingerprint = Fingerprinter::system().compute();
            if fingerprint.is_degraded() {
                anyhow::bail!("Unable to fingerprint this machine; pass --machine-id");
            }
            fingerprint.machine_id().to_string()
        }
    };

    let license = issuer
        .issue_for_tier(tier, &machine_id, user, product, expires)
        .context("Failed to issue license")?;

    match out {
        Some(out) => {
            write_license(&out, &license)?;
            print!("{}", render_license(&license));
            println!("\nWrote {}", out.display());
        }
        // Stdout carries only the license so it can be redirected to a file.
        None => println!("{}", license_json(&license)?),
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(
    store_config: &StoreConfig,
    public_key: PathBuf,
    license_path: Option<PathBuf>,
    skip_signature: bool,
    feature: Option<String>,
    install: bool,
) -> Result<ExitCode> {
    let validator = LicenseValidator::for_current_machine(read_public_key(&public_key)?);
    let store = LicenseStore::new(store_config).context("Failed to open license store")?;

    let license = match &license_path {
        Some(path) => Some(read_license(path)?),
        None => store.retrieve(),
    };

    let mut result = validator.validate(license.as_ref(), skip_signature);
    if let (Some(license), Some(feature)) = (&license, &feature) {
        result.combine(validator.validate_feature(license, feature));
    }
    println!("{}", render_result(&result));

    if !result.is_valid() {
        return Ok(ExitCode::FAILURE);
    }

    if install && let Some(license) = &license {
        store.store(license).context("Failed to store license")?;
        info!(path = %store.path().display(), "license installed");
        println!("\nInstalled to {}", store.path().display());
    }
    Ok(ExitCode::SUCCESS)
}

fn show(store_config: &StoreConfig) -> Result<ExitCode> {
    let store = LicenseStore::new(store_config).context("Failed to open license store")?;
    if !store.exists() {
        println!("No license stored at {}", store.path().display());
        return Ok(ExitCode::FAILURE);
    }

    match store.try_retrieve().context("Failed to read stored license")? {
        Some(license) => {
            print!("{}", render_license(&license));
            if license.is_expired() {
                println!("\nThis license has expired.");
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("No license stored at {}", store.path().display());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn delete(store_config: &StoreConfig) -> Result<ExitCode> {
    let store = LicenseStore::new(store_config).context("Failed to open license store")?;
    store.delete().context("Failed to delete license")?;
    println!("Deleted {}", store.path().display());
    Ok(ExitCode::SUCCESS)
}

fn manifest(base: PathBuf, out: PathBuf, files: &[PathBuf]) -> Result<ExitCode> {
    let manifest =
        IntegrityManifest::generate(&base, files).context("Failed to hash manifest files")?;
    manifest.save(&out).context("Failed to write manifest")?;
    println!("Wrote {} entries to {}", manifest.entries.len(), out.display());
    Ok(ExitCode::SUCCESS)
}

async fn monitor(config: Option<PathBuf>, once: bool) -> Result<ExitCode> {
    let config = load_monitor_config(config.as_deref())?;
    let monitor = TrustMonitor::from_config(&config).context("Failed to build trust monitor")?;

    if once {
        let report = monitor.evaluate();
        for finding in &report.findings {
            println!("[{}] {}", finding.check, finding.detail);
        }
        println!("State: {:?}", report.state());
        return Ok(if report.is_compromised() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let cancel = CancellationToken::new();
    let handle = monitor.spawn(cancel.clone());
    let mut state = handle.subscribe();

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("interrupt received");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                if *state.borrow_and_update() == MonitorState::Compromised {
                    warn!("trust monitor reports a compromised process");
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(ExitCode::SUCCESS)
}
