//! Settings management

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use strata_asset::AssetDatabaseConfig;
use strata_core::{PoolConfig, UuidConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sizing for scene object and component pools.
    pub pool: PoolConfig,
    pub uuid: UuidConfig,
    pub assets: AssetDatabaseConfig,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        match Self::load(&path) {
            Err(SettingsError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No settings at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            result => result,
        }
    }
}
