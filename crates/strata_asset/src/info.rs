// info.rs - Per-asset bookkeeping records and metadata sidecars

use crate::types::{Asset, AssetTypeId, LoadedAsset};
use crate::AssetError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use strata_core::Uuid;

bitflags! {
    /// Independent status bits tracked per asset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AssetStatus: u8 {
        /// Backing file changed since the last import.
        const CHANGED = 1 << 0;
        /// No sidecar metadata on disk yet.
        const NO_METADATA = 1 << 1;
        /// Waiting for `import_pending`.
        const NEEDS_IMPORT = 1 << 2;
    }
}

/// Snapshot of a file on disk, used to detect modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    pub fn stat(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    /// True when size or modification time differ.
    pub fn differs(&self, other: &FileEntry) -> bool {
        self.size != other.size || self.modified != other.modified
    }
}

/// Bookkeeping for one asset inside one source table.
pub struct AssetInfo {
    uuid: Uuid,
    path: PathBuf,
    pub(crate) asset_type: Option<AssetTypeId>,
    pub(crate) asset: Option<LoadedAsset>,
    pub(crate) file: Option<FileEntry>,
    pub(crate) status: AssetStatus,
}

impl AssetInfo {
    pub fn new(uuid: Uuid, path: impl Into<PathBuf>) -> Self {
        Self {
            uuid,
            path: path.into(),
            asset_type: None,
            asset: None,
            file: None,
            status: AssetStatus::empty(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Path relative to the owning root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    pub fn asset_type(&self) -> Option<AssetTypeId> {
        self.asset_type
    }

    pub fn asset(&self) -> Option<&LoadedAsset> {
        self.asset.as_ref()
    }

    pub fn asset_mut(&mut self) -> Option<&mut LoadedAsset> {
        self.asset.as_mut()
    }

    pub fn get<T: Asset>(&self) -> Option<&T> {
        self.asset.as_ref()?.downcast_ref()
    }

    pub fn get_mut<T: Asset>(&mut self) -> Option<&mut T> {
        self.asset.as_mut()?.downcast_mut()
    }

    pub fn is_loaded(&self) -> bool {
        self.asset.is_some()
    }

    pub fn file(&self) -> Option<&FileEntry> {
        self.file.as_ref()
    }

    pub fn status(&self) -> AssetStatus {
        self.status
    }

    pub fn needs_import(&self) -> bool {
        self.status.contains(AssetStatus::NEEDS_IMPORT)
    }
}

impl std::fmt::Debug for AssetInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetInfo")
            .field("uuid", &self.uuid)
            .field("path", &self.path)
            .field("asset_type", &self.asset_type)
            .field("loaded", &self.asset.is_some())
            .field("status", &self.status)
            .finish()
    }
}

/// Sidecar written next to each asset file as `<file>.meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMeta {
    pub uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetTypeId>,
}

impl AssetMeta {
    pub const EXTENSION: &'static str = "meta";

    pub fn sidecar_path(asset_path: &Path) -> PathBuf {
        let mut name = asset_path.as_os_str().to_owned();
        name.push(".");
        name.push(Self::EXTENSION);
        PathBuf::from(name)
    }

    pub fn is_sidecar(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == Self::EXTENSION)
    }

    /// Read the sidecar for `asset_path`. A missing sidecar is `Ok(None)`.
    pub fn read(asset_path: &Path) -> Result<Option<Self>, AssetError> {
        let path = Self::sidecar_path(asset_path);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| AssetError::Metadata { path, source })
    }

    pub fn write(&self, asset_path: &Path) -> Result<(), AssetError> {
        let path = Self::sidecar_path(asset_path);
        let text = serde_json::to_string_pretty(self).map_err(|source| AssetError::Metadata {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text)?;
        Ok(())
    }
}
