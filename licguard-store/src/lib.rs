//! Encrypted license persistence for licguard.
//!
//! One license per store, in a single file at a per-user location. Reads
//! never fail loudly: [`LicenseStore::retrieve`] turns every I/O, key or
//! corruption problem into `None` and logs why.

mod config;
mod envelope;
mod error;
mod install_key;
mod store;

pub use config::{
    default_license_path, StoreConfig, APP_DIR_NAME, INSTALL_KEY_FILE_NAME, LICENSE_FILE_NAME,
};
pub use envelope::{LicenseEnvelope, ENVELOPE_VERSION};
pub use error::{StoreError, StoreResult};
pub use store::LicenseStore;
