//! Per-installation store key.
//!
//! Generated on first write and kept beside the license, readable only by
//! the owner on Unix. It stops a copied license file from opening on
//! another installation; it is not a secret from the local user.

use crate::error::{StoreError, StoreResult};
use licguard_crypto::{generate_symmetric_key, SymmetricKey};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Loads the key at `path`, or `None` when the file does not exist.
pub fn load(path: &Path) -> StoreResult<Option<SymmetricKey>> {
    match fs::read_to_string(path) {
        Ok(encoded) => {
            let encoded = Zeroizing::new(encoded);
            Ok(Some(SymmetricKey::from_base64(encoded.trim())?))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Loads the key at `path`, generating and persisting one if absent.
///
/// A key file that cannot be decoded (empty, truncated or garbage) is
/// replaced. Whatever it once held can no longer open anything.
pub fn load_or_create(path: &Path) -> StoreResult<SymmetricKey> {
    match load(path) {
        Ok(Some(key)) => Ok(key),
        Ok(None) => write_new(path, false),
        Err(StoreError::Crypto(e)) => {
            warn!(path = %path.display(), error = %e, "installation key unreadable, replacing it");
            write_new(path, true)
        }
        Err(e) => Err(e),
    }
}

/// Writes a fresh key through a temporary file so `path` never holds a
/// partial key. Without `replace`, a key another writer created first wins.
fn write_new(path: &Path, replace: bool) -> StoreResult<SymmetricKey> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let key = generate_symmetric_key();
    let mut tmp = NamedTempFile::new_in(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))?;
    }
    let encoded = Zeroizing::new(key.to_base64());
    tmp.write_all(encoded.as_bytes())?;
    tmp.as_file().sync_all()?;

    let persisted = if replace {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    match persisted {
        Ok(_) => {
            info!(path = %path.display(), "created installation key");
            Ok(key)
        }
        // Another writer got there first.
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            load(path)?.ok_or_else(|| StoreError::MissingInstallationKey(path.to_path_buf()))
        }
        Err(e) => Err(StoreError::Io(e.error)),
    }
}
