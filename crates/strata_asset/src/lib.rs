//! Asset database for Strata
//!
//! Assets are found on disk under up to five sources (built-in, editor, game,
//! runtime, override), each with a primary root and an optional database
//! root. Every asset gets a uuid persisted in a `.meta` sidecar; lookups by
//! uuid walk the sources in a fixed precedence order.

pub mod database;
pub mod error;
pub mod feed;
pub mod format;
pub mod info;
pub mod source;
pub mod types;

pub use database::{AssetDatabase, AssetDatabaseConfig, CreateFlags, RefreshMode, RefreshReport};
pub use error::AssetError;
pub use feed::{queued_feed, ChangeFeed, ChangeKind, ChangeRecord, ChangeSender, QueuedFeed, ScanFeed};
pub use format::AssetFormat;
pub use info::{AssetInfo, AssetMeta, AssetStatus, FileEntry};
pub use source::{AssetTable, SourceConfig, SourceKind, SourceRoot, VfsSource};
pub use types::{Asset, AssetTypeId, AssetTypeRegistry, AssetVTable, BlobAsset, LoadedAsset, TextAsset};
