use crate::source::SourceKind;
use crate::types::AssetTypeId;
use std::path::PathBuf;
use strata_core::{TableError, Uuid, UuidError};
use thiserror::Error;

/// Errors surfaced by the asset database. All of them are recoverable.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset {0} not found")]
    NotFound(Uuid),

    #[error("asset {0} has no loaded value")]
    NotLoaded(Uuid),

    #[error("unrecognized asset header")]
    UnknownFormat,

    #[error("asset type {0} is not registered")]
    UnknownAssetType(AssetTypeId),

    #[error("asset type {0} is already registered")]
    TypeAlreadyRegistered(AssetTypeId),

    #[error("asset type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: AssetTypeId,
        found: AssetTypeId,
    },

    #[error("path '{}' is already in use", .0.display())]
    PathInUse(PathBuf),

    #[error("source {0:?} has no root configured")]
    SourceNotConfigured(SourceKind),

    #[error("asset serializer failed: {0}")]
    Serializer(String),

    #[error("metadata '{}': {source}", .path.display())]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Uuid(#[from] UuidError),

    #[error(transparent)]
    Table(#[from] TableError),
}
