//! Encrypted license persistence.
//!
//! With the default installation key the file holds the base64 of
//! `nonce || ciphertext || tag`. With a caller-supplied key it holds a JSON
//! [`LicenseEnvelope`]. Either way the ciphertext is authenticated, so a
//! flipped byte fails decryption instead of yielding a corrupted license.

use crate::config::{StoreConfig, INSTALL_KEY_FILE_NAME};
use crate::envelope::LicenseEnvelope;
use crate::error::{StoreError, StoreResult};
use crate::install_key;
use licguard_crypto::{decrypt, encrypt, random_bytes, EncryptedData, SymmetricKey};
use licguard_license::License;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Overwrite chunk size for [`LicenseStore::delete`].
const WIPE_CHUNK: usize = 64 * 1024;

/// Which key protects the file.
enum StoreKey {
    /// Per-installation key stored beside the license.
    Installation,
    /// Caller-supplied key; the file is an envelope.
    Custom(SymmetricKey),
}

/// Reads and writes one encrypted license file.
///
/// Writes from one process are serialized; across processes the last
/// writer wins, since each write replaces the file atomically.
pub struct LicenseStore {
    path: PathBuf,
    key: StoreKey,
    write_lock: Mutex<()>,
}

impl LicenseStore {
    /// A store protected by the per-installation key.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self::from_parts(config.license_path()?, StoreKey::Installation))
    }

    /// A store protected by `key`, written as an envelope.
    pub fn with_key(config: &StoreConfig, key: SymmetricKey) -> StoreResult<Self> {
        Ok(Self::from_parts(config.license_path()?, StoreKey::Custom(key)))
    }

    fn from_parts(path: PathBuf, key: StoreKey) -> Self {
        Self {
            path,
            key,
            write_lock: Mutex::new(()),
        }
    }

    /// The license file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The installation key path, beside the license file.
    pub fn installation_key_path(&self) -> PathBuf {
        self.path.with_file_name(INSTALL_KEY_FILE_NAME)
    }

    /// Whether a license file is present. Says nothing about readability.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Serializes, encrypts and atomically replaces the license file.
    pub fn store(&self, license: &License) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let plaintext = Zeroizing::new(serde_json::to_vec(license)?);
        let contents = match &self.key {
            StoreKey::Installation => {
                let key = install_key::load_or_create(&self.installation_key_path())?;
                encrypt(&key, &plaintext)?.to_base64()
            }
            StoreKey::Custom(key) => {
                serde_json::to_string(&LicenseEnvelope::seal(key, &plaintext)?)?
            }
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        info!(tier = %license.tier, path = %self.path.display(), "stored license");
        Ok(())
    }

    /// Loads the license, reporting why it could not be read.
    ///
    /// `Ok(None)` when no license file exists.
    pub fn try_retrieve(&self) -> StoreResult<Option<License>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let plaintext = match &self.key {
            StoreKey::Installation => {
                let key_path = self.installation_key_path();
                let key = install_key::load(&key_path)?
                    .ok_or(StoreError::MissingInstallationKey(key_path))?;
                let encrypted = EncryptedData::from_base64(contents.trim())?;
                Zeroizing::new(decrypt(&key, &encrypted)?)
            }
            StoreKey::Custom(key) => {
                let envelope: LicenseEnvelope = serde_json::from_str(&contents)?;
                envelope.open(key)?
            }
        };

        let license: License = serde_json::from_slice(&plaintext)?;
        debug!(tier = %license.tier, "retrieved license");
        Ok(Some(license))
    }

    /// Loads the license. Any failure, including a missing file, is `None`.
    pub fn retrieve(&self) -> Option<License> {
        match self.try_retrieve() {
            Ok(license) => license,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "stored license is unreadable");
                None
            }
        }
    }

    /// A license can be retrieved and has not expired.
    ///
    /// Advisory only: this does not check the signature or machine binding.
    pub fn has_valid_license(&self) -> bool {
        self.retrieve().is_some_and(|license| license.is_valid_license())
    }

    /// Overwrites the file with random bytes of the same length, then
    /// removes it. Succeeds when there is nothing to delete.
    ///
    /// This is a best-effort erase. Journaling and copy-on-write
    /// filesystems, SSD wear leveling and backups can all keep the old
    /// contents; do not rely on it for secrecy.
    pub fn delete(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        {
            let mut file = OpenOptions::new().write(true).open(&self.path)?;
            let mut remaining = usize::try_from(len).unwrap_or(usize::MAX);
            while remaining > 0 {
                let chunk = remaining.min(WIPE_CHUNK);
                file.write_all(&random_bytes(chunk))?;
                remaining -= chunk;
            }
            file.sync_all()?;
        }
        fs::remove_file(&self.path)?;

        info!(path = %self.path.display(), "deleted license");
        Ok(())
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}
