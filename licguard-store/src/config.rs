//! Store location.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Folder created under the platform data directory.
pub const APP_DIR_NAME: &str = "licguard";

/// Name of the encrypted license file.
pub const LICENSE_FILE_NAME: &str = "license.lic";

/// Name of the installation key file, kept beside the license.
pub const INSTALL_KEY_FILE_NAME: &str = "install.key";

/// Where the license is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// License file path. Defaults to `<data dir>/licguard/license.lic`.
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// A config pointing at an explicit license file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The license file path this config resolves to.
    pub fn license_path(&self) -> StoreResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => default_license_path(),
        }
    }
}

/// `<data dir>/licguard/license.lic` for the current user.
pub fn default_license_path() -> StoreResult<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(LICENSE_FILE_NAME))
        .ok_or(StoreError::NoDataDirectory)
}
