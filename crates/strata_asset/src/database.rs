//! Multi-source asset database
//!
//! One [`VfsSource`] per [`SourceKind`]. Lookups walk the sources in
//! [`SourceKind::PRECEDENCE`] order and return the first hit. Refresh only
//! marks entries; loading happens in [`AssetDatabase::import_pending`].

use crate::feed::{queued_feed, scan_dir, ChangeFeed, ChangeKind, ChangeRecord, ChangeSender, ScanFeed};
use crate::format::AssetFormat;
use crate::info::{AssetInfo, AssetMeta, AssetStatus, FileEntry};
use crate::source::{AssetTable, SourceConfig, SourceKind, SourceRoot, VfsSource};
use crate::types::{Asset, AssetTypeRegistry};
use crate::AssetError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use strata_core::uuid::AssetCategory;
use strata_core::{AssetResolver, PoolConfig, Uuid, UuidRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetDatabaseConfig {
    pub sources: Vec<SourceConfig>,
    /// Capacity of queues created by [`AssetDatabase::queued_feed`].
    pub feed_capacity: usize,
    /// Pool sizing for every per-root table.
    pub pool: PoolConfig,
}

impl AssetDatabaseConfig {
    pub const DEFAULT_FEED_CAPACITY: usize = 256;
}

impl Default for AssetDatabaseConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            feed_capacity: Self::DEFAULT_FEED_CAPACITY,
            pool: PoolConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Apply whatever the source's change feed has queued.
    Incremental,
    /// Rescan the roots and diff against the tables.
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
    pub renamed: usize,
}

impl RefreshReport {
    pub fn merge(&mut self, other: RefreshReport) {
        self.added += other.added;
        self.changed += other.changed;
        self.removed += other.removed;
        self.renamed += other.renamed;
    }

    pub fn total(&self) -> usize {
        self.added + self.changed + self.removed + self.renamed
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CreateFlags: u8 {
        /// Place the asset under the source's database root.
        const IN_DATABASE = 1 << 0;
        /// Write the file and its sidecar immediately.
        const WRITE = 1 << 1;
        /// Replace an existing entry at the same path.
        const OVERWRITE = 1 << 2;
    }
}

pub struct AssetDatabase {
    config: AssetDatabaseConfig,
    sources: Vec<VfsSource>,
    types: AssetTypeRegistry,
    uuids: UuidRegistry,
}

impl AssetDatabase {
    pub fn new(config: AssetDatabaseConfig, types: AssetTypeRegistry, uuids: UuidRegistry) -> Self {
        Self {
            config,
            sources: SourceKind::ALL.into_iter().map(VfsSource::new).collect(),
            types,
            uuids,
        }
    }

    pub fn config(&self) -> &AssetDatabaseConfig {
        &self.config
    }

    pub fn types(&self) -> &AssetTypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut AssetTypeRegistry {
        &mut self.types
    }

    pub fn uuids(&self) -> &UuidRegistry {
        &self.uuids
    }

    pub fn source(&self, kind: SourceKind) -> &VfsSource {
        &self.sources[kind.index()]
    }

    /// Kinds with a configured root, in declaration order.
    pub fn configured_kinds(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|kind| self.config.sources.iter().any(|source| source.kind == *kind))
            .collect()
    }

    /// (Re)build the path index of each listed source from disk.
    pub fn build_vfs(&mut self, kinds: &[SourceKind]) -> Result<RefreshReport, AssetError> {
        let mut total = RefreshReport::default();
        for &kind in kinds {
            let config = self
                .config
                .sources
                .iter()
                .find(|source| source.kind == kind)
                .cloned()
                .ok_or(AssetError::SourceNotConfigured(kind))?;

            let source = &mut self.sources[kind.index()];
            let previous = [source.primary.take(), source.database.take()];
            let previous_feed = source.feed.take();
            source.primary = Some(AssetTable::new(&config.root, self.config.pool));
            source.database = config
                .database_root
                .as_ref()
                .map(|root| AssetTable::new(root, self.config.pool));

            let built = self.refresh(kind, RefreshMode::Full).and_then(|report| {
                let feed: Option<Box<dyn ChangeFeed>> = if config.watch {
                    Some(Box::new(ScanFeed::new(&config.root)?))
                } else {
                    None
                };
                Ok((report, feed))
            });
            let (report, feed) = match built {
                Ok(built) => built,
                Err(err) => {
                    // The previous index stays authoritative until a rebuild completes.
                    let source = &mut self.sources[kind.index()];
                    let partial = drain_tables([source.primary.take(), source.database.take()]);
                    let [primary, database] = previous;
                    source.primary = primary;
                    source.database = database;
                    source.feed = previous_feed;
                    self.retire(partial);
                    tracing::warn!("Rebuilding {} source failed, previous index kept: {}", kind.name(), err);
                    return Err(err);
                }
            };
            self.sources[kind.index()].feed = feed;
            self.retire(drain_tables(previous));

            tracing::info!(
                "Built {} source at {}: {} assets",
                kind.name(),
                config.root.display(),
                self.sources[kind.index()].len()
            );
            total.merge(report);
        }
        Ok(total)
    }

    /// Bring a source's tables up to date, marking entries for import.
    pub fn refresh(&mut self, kind: SourceKind, mode: RefreshMode) -> Result<RefreshReport, AssetError> {
        let source = &mut self.sources[kind.index()];
        if !source.is_configured() {
            return Err(AssetError::SourceNotConfigured(kind));
        }

        let mut removed = Vec::new();
        let mut report = RefreshReport::default();
        match mode {
            RefreshMode::Full => {
                for root in [SourceRoot::Primary, SourceRoot::Database] {
                    if let Some(table) = source.table_mut(root) {
                        let mut pass = Pass::new(table, &mut self.uuids, &mut removed);
                        pass.rescan()?;
                        report.merge(pass.report);
                    }
                }
            }
            RefreshMode::Incremental => {
                let mut records = Vec::new();
                match source.feed.as_mut() {
                    Some(feed) => {
                        feed.poll(&mut records)?;
                    }
                    None => tracing::debug!("{} source has no change feed", kind.name()),
                }
                for record in records {
                    let Some((root, record)) = route(source, record) else {
                        continue;
                    };
                    if let Some(table) = source.table_mut(root) {
                        let mut pass = Pass::new(table, &mut self.uuids, &mut removed);
                        if let Err(err) = pass.apply(&record) {
                            tracing::warn!("Failed to apply {:?} {}: {}", record.kind, record.path.display(), err);
                        }
                        report.merge(pass.report);
                    }
                }
            }
        }

        self.retire(removed);
        if report.total() > 0 {
            tracing::debug!(
                "Refreshed {} source: {} added, {} changed, {} removed, {} renamed",
                kind.name(),
                report.added,
                report.changed,
                report.removed,
                report.renamed
            );
        }
        Ok(report)
    }

    /// Load every entry flagged for import. Returns how many were loaded.
    ///
    /// Entries that fail to read or decode keep their flags and are retried
    /// on the next call.
    pub fn import_pending(&mut self, kind: SourceKind) -> Result<usize, AssetError> {
        let source = &mut self.sources[kind.index()];
        if !source.is_configured() {
            return Err(AssetError::SourceNotConfigured(kind));
        }

        let mut imported = 0;
        for root in [SourceRoot::Primary, SourceRoot::Database] {
            let Some(table) = source.table_mut(root) else {
                continue;
            };
            for uuid in table.uuids_where(AssetInfo::needs_import) {
                match import_one(table, &self.types, uuid) {
                    Ok(()) => imported += 1,
                    Err(err) => tracing::warn!("Failed to import asset {}: {}", uuid, err),
                }
            }
        }
        if imported > 0 {
            tracing::info!("Imported {} assets into {} source", imported, kind.name());
        }
        Ok(imported)
    }

    /// First match in precedence order.
    pub fn get_asset_by_uuid(&self, uuid: Uuid, prefer_database: bool) -> Option<&AssetInfo> {
        if uuid.is_empty() {
            return None;
        }
        SourceKind::PRECEDENCE
            .into_iter()
            .find_map(|kind| self.sources[kind.index()].find(uuid, prefer_database))
            .map(|(_, info)| info)
    }

    /// Source and root that win for `uuid`.
    pub fn locate(&self, uuid: Uuid, prefer_database: bool) -> Option<(SourceKind, SourceRoot)> {
        if uuid.is_empty() {
            return None;
        }
        SourceKind::PRECEDENCE.into_iter().find_map(|kind| {
            self.sources[kind.index()]
                .find(uuid, prefer_database)
                .map(|(root, _)| (kind, root))
        })
    }

    pub fn get_asset<T: Asset>(&self, uuid: Uuid) -> Option<&T> {
        self.get_asset_by_uuid(uuid, false)?.get::<T>()
    }

    pub fn get_asset_mut<T: Asset>(&mut self, uuid: Uuid) -> Option<&mut T> {
        self.info_mut(uuid)?.get_mut::<T>()
    }

    fn info_mut(&mut self, uuid: Uuid) -> Option<&mut AssetInfo> {
        let (kind, root) = self.locate(uuid, false)?;
        self.sources[kind.index()]
            .table_mut(root)?
            .get_by_uuid_mut(uuid)
    }

    /// Allocate a default `T` at `path` and give it a fresh uuid.
    ///
    /// The value lives in memory until saved, either through
    /// [`CreateFlags::WRITE`] or a later [`save_asset`](Self::save_asset).
    pub fn create_asset<T: Asset>(
        &mut self,
        path: impl AsRef<Path>,
        flags: CreateFlags,
        kind: SourceKind,
    ) -> Result<Uuid, AssetError> {
        let root = if flags.contains(CreateFlags::IN_DATABASE) {
            SourceRoot::Database
        } else {
            SourceRoot::Primary
        };
        let asset = self.types.allocate(T::TYPE)?;

        let table = self.sources[kind.index()]
            .table_mut(root)
            .ok_or(AssetError::SourceNotConfigured(kind))?;
        let relative = table.relative(path.as_ref());
        let occupied = table.get_by_path(&relative).is_some();
        if occupied && !flags.contains(CreateFlags::OVERWRITE) {
            self.types.destroy(asset);
            return Err(AssetError::PathInUse(relative));
        }

        // The old entry is only removed once its replacement has an identity.
        let uuid = match self.uuids.generate::<AssetCategory>() {
            Ok(uuid) => uuid,
            Err(err) => {
                self.types.destroy(asset);
                return Err(err.into());
            }
        };
        let mut info = AssetInfo::new(uuid, relative.clone());
        info.asset_type = Some(T::TYPE);
        info.asset = Some(asset);
        info.status = AssetStatus::NO_METADATA;

        let table = self.sources[kind.index()]
            .table_mut(root)
            .ok_or(AssetError::SourceNotConfigured(kind))?;
        let replaced = if occupied { table.remove_by_path(&relative) } else { None };
        if let Err(err) = table.insert(info) {
            if let Some(old) = replaced {
                if let Err(restore) = table.insert(old) {
                    tracing::error!("Could not restore {} after failed overwrite: {}", relative.display(), restore);
                }
            }
            self.uuids.remove::<AssetCategory>(uuid);
            return Err(err);
        }
        self.retire(replaced.into_iter().collect());
        tracing::debug!("Created {} asset {} in {} source", T::NAME, uuid, kind.name());

        if flags.contains(CreateFlags::WRITE) {
            self.save_in(kind, root, uuid)?;
        }
        Ok(uuid)
    }

    /// Serialize the winning entry for `uuid` to disk, with its sidecar.
    pub fn save_asset(&mut self, uuid: Uuid) -> Result<(), AssetError> {
        let (kind, root) = self.locate(uuid, false).ok_or(AssetError::NotFound(uuid))?;
        self.save_in(kind, root, uuid)
    }

    fn save_in(&mut self, kind: SourceKind, root: SourceRoot, uuid: Uuid) -> Result<(), AssetError> {
        let table = self.sources[kind.index()]
            .table_mut(root)
            .ok_or(AssetError::SourceNotConfigured(kind))?;
        let info = table.get_by_uuid(uuid).ok_or(AssetError::NotFound(uuid))?;
        let path = table.absolute(info.path());
        let asset = info.asset().ok_or(AssetError::NotLoaded(uuid))?;

        let mut bytes = Vec::new();
        self.types.serialize(asset, &mut bytes)?;
        let meta = AssetMeta {
            uuid,
            asset_type: Some(asset.asset_type()),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &bytes)?;
        meta.write(&path)?;

        let info = table.get_by_uuid_mut(uuid).ok_or(AssetError::NotFound(uuid))?;
        info.file = Some(FileEntry::stat(&path)?);
        info.status = AssetStatus::empty();
        tracing::debug!("Saved asset {} to {}", uuid, path.display());
        Ok(())
    }

    /// Drop `uuid` from one source, optionally deleting its files.
    ///
    /// The uuid stays registered while any other source still holds it.
    pub fn destroy_asset(&mut self, kind: SourceKind, uuid: Uuid, delete_files: bool) -> Result<(), AssetError> {
        let source = &mut self.sources[kind.index()];
        let roots: Vec<SourceRoot> = [SourceRoot::Primary, SourceRoot::Database]
            .into_iter()
            .filter(|&root| source.table(root).is_some_and(|table| table.contains_uuid(uuid)))
            .collect();
        if roots.is_empty() {
            return Err(AssetError::NotFound(uuid));
        }

        // Files go first so a failed delete leaves the entries in place.
        if delete_files {
            for &root in &roots {
                let Some(table) = source.table(root) else {
                    continue;
                };
                let Some(info) = table.get_by_uuid(uuid) else {
                    continue;
                };
                let path = table.absolute(info.path());
                remove_if_present(&path)?;
                remove_if_present(&AssetMeta::sidecar_path(&path))?;
            }
        }

        let removed = roots
            .into_iter()
            .filter_map(|root| source.table_mut(root)?.remove_by_uuid(uuid))
            .collect();
        self.retire(removed);
        Ok(())
    }

    /// Attach a bounded queue to `kind` and return its producer half.
    pub fn queued_feed(&mut self, kind: SourceKind) -> Result<ChangeSender, AssetError> {
        let (sender, feed) = queued_feed(self.config.feed_capacity);
        self.attach_feed(kind, Box::new(feed))?;
        Ok(sender)
    }

    pub fn attach_feed(&mut self, kind: SourceKind, feed: Box<dyn ChangeFeed>) -> Result<(), AssetError> {
        let source = &mut self.sources[kind.index()];
        if !source.is_configured() {
            return Err(AssetError::SourceNotConfigured(kind));
        }
        source.feed = Some(feed);
        Ok(())
    }

    /// Destroy loaded values of removed records and release unused uuids.
    fn retire(&mut self, removed: Vec<AssetInfo>) {
        for mut info in removed {
            if let Some(asset) = info.asset.take() {
                self.types.destroy(asset);
            }
            let uuid = info.uuid();
            if !self.sources.iter().any(|source| source.contains_uuid(uuid)) {
                self.uuids.remove::<AssetCategory>(uuid);
            }
        }
    }
}

impl AssetResolver for AssetDatabase {
    type Asset = AssetInfo;

    fn asset_by_uuid(&self, uuid: Uuid, prefer_database: bool) -> Option<&AssetInfo> {
        self.get_asset_by_uuid(uuid, prefer_database)
    }
}

/// One refresh step over a single table.
struct Pass<'a> {
    table: &'a mut AssetTable,
    uuids: &'a mut UuidRegistry,
    removed: &'a mut Vec<AssetInfo>,
    report: RefreshReport,
}

impl<'a> Pass<'a> {
    fn new(table: &'a mut AssetTable, uuids: &'a mut UuidRegistry, removed: &'a mut Vec<AssetInfo>) -> Self {
        Self {
            table,
            uuids,
            removed,
            report: RefreshReport::default(),
        }
    }

    fn rescan(&mut self) -> Result<(), AssetError> {
        let current = scan_dir(self.table.root())?;

        // Entries never written to disk are left alone.
        let gone: Vec<PathBuf> = self
            .table
            .iter()
            .filter(|info| info.file().is_some() && !current.contains_key(info.path()))
            .map(|info| info.path().to_path_buf())
            .collect();
        for path in gone {
            self.forget(&path);
        }

        for (path, file) in current {
            if self.table.get_by_path(&path).is_some() {
                self.touch(&path, file);
            } else {
                self.discover(path, file)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, record: &ChangeRecord) -> Result<(), AssetError> {
        match record.kind {
            ChangeKind::None => Ok(()),
            ChangeKind::Create | ChangeKind::Modified => self.upsert(&record.path),
            ChangeKind::Delete => {
                self.forget(&record.path);
                Ok(())
            }
            ChangeKind::Rename => match &record.destination {
                Some(to) => self.rename(&record.path, to),
                None => {
                    self.forget(&record.path);
                    Ok(())
                }
            },
        }
    }

    fn upsert(&mut self, path: &Path) -> Result<(), AssetError> {
        let file = match FileEntry::stat(&self.table.absolute(path)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.forget(path);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        if self.table.get_by_path(path).is_some() {
            self.touch(path, file);
            Ok(())
        } else {
            self.discover(path.to_path_buf(), file)
        }
    }

    fn discover(&mut self, path: PathBuf, file: FileEntry) -> Result<(), AssetError> {
        let absolute = self.table.absolute(&path);
        let meta = AssetMeta::read(&absolute).unwrap_or_else(|err| {
            tracing::warn!("Ignoring metadata: {}", err);
            None
        });

        let mut status = AssetStatus::NEEDS_IMPORT;
        let (uuid, asset_type, claimed) = match meta {
            // A copied sidecar inside one table gets a fresh identity.
            Some(meta) if !meta.uuid.is_empty() && !self.table.contains_uuid(meta.uuid) => {
                let claimed = self.uuids.add::<AssetCategory>(meta.uuid);
                (meta.uuid, meta.asset_type, claimed)
            }
            _ => {
                status |= AssetStatus::NO_METADATA;
                (self.uuids.generate::<AssetCategory>()?, None, true)
            }
        };

        let mut info = AssetInfo::new(uuid, path);
        info.asset_type = asset_type;
        info.file = Some(file);
        info.status = status;
        match self.table.insert(info) {
            Ok(_) => {
                self.report.added += 1;
                Ok(())
            }
            Err(err) => {
                if claimed {
                    self.uuids.remove::<AssetCategory>(uuid);
                }
                Err(err)
            }
        }
    }

    fn touch(&mut self, path: &Path, file: FileEntry) {
        let Some(info) = self.table.get_by_path_mut(path) else {
            return;
        };
        if info.file.as_ref().is_some_and(|old| !old.differs(&file)) {
            return;
        }
        info.file = Some(file);
        info.status |= AssetStatus::CHANGED | AssetStatus::NEEDS_IMPORT;
        self.report.changed += 1;
    }

    fn forget(&mut self, path: &Path) {
        if let Some(info) = self.table.remove_by_path(path) {
            self.removed.push(info);
            self.report.removed += 1;
        }
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<(), AssetError> {
        if self.table.get_by_path(from).is_none() {
            return self.upsert(to);
        }
        if from == to {
            return Ok(());
        }
        self.forget(to);
        self.table.rename(from, to)?;
        self.report.renamed += 1;

        let old = self.table.absolute(from);
        let new = self.table.absolute(to);
        let Some(info) = self.table.get_by_path_mut(to) else {
            return Ok(());
        };
        info.file = FileEntry::stat(&new).ok();

        let sidecar = AssetMeta::sidecar_path(&new);
        if sidecar.exists() {
            return Ok(());
        }
        let moved = fs::rename(AssetMeta::sidecar_path(&old), &sidecar).or_else(|_| {
            AssetMeta {
                uuid: info.uuid(),
                asset_type: info.asset_type,
            }
            .write(&new)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))
        });
        if let Err(err) = moved {
            tracing::warn!("Could not carry metadata to {}: {}", new.display(), err);
            info.status |= AssetStatus::NO_METADATA;
        }
        Ok(())
    }
}

/// Pick the table a record belongs to and make its paths root-relative.
fn route(source: &VfsSource, mut record: ChangeRecord) -> Option<(SourceRoot, ChangeRecord)> {
    if AssetMeta::is_sidecar(&record.path) {
        return None;
    }
    let root = if record.path.is_relative() {
        SourceRoot::Primary
    } else {
        [SourceRoot::Database, SourceRoot::Primary]
            .into_iter()
            .find(|&root| {
                source
                    .table(root)
                    .is_some_and(|table| record.path.starts_with(table.root()))
            })?
    };
    let table = source.table(root)?;
    record.path = table.relative(&record.path);
    record.destination = record.destination.map(|to| table.relative(&to));
    Some((root, record))
}

fn import_one(table: &mut AssetTable, types: &AssetTypeRegistry, uuid: Uuid) -> Result<(), AssetError> {
    let info = table.get_by_uuid(uuid).ok_or(AssetError::NotFound(uuid))?;
    let path = table.absolute(info.path());
    let bytes = fs::read(&path)?;

    let asset_type = match info.asset_type.filter(|&id| types.contains(id)) {
        Some(id) => id,
        None => {
            let format = AssetFormat::sniff(&bytes)
                .ok()
                .or_else(|| AssetFormat::from_path(&path));
            types.type_for_format(format)
        }
    };
    let loaded = types.deserialize(asset_type, &bytes)?;

    let info = table.get_by_uuid_mut(uuid).ok_or(AssetError::NotFound(uuid))?;
    if let Some(old) = info.asset.replace(loaded) {
        types.destroy(old);
    }
    info.asset_type = Some(asset_type);
    info.status.remove(AssetStatus::CHANGED | AssetStatus::NEEDS_IMPORT);

    if info.status.contains(AssetStatus::NO_METADATA) {
        let meta = AssetMeta {
            uuid,
            asset_type: Some(asset_type),
        };
        match meta.write(&path) {
            Ok(()) => info.status.remove(AssetStatus::NO_METADATA),
            Err(err) => tracing::warn!("Could not write metadata for {}: {}", path.display(), err),
        }
    }
    Ok(())
}

fn drain_tables(tables: [Option<AssetTable>; 2]) -> Vec<AssetInfo> {
    let mut records = Vec::new();
    for mut table in tables.into_iter().flatten() {
        for uuid in table.uuids_where(|_| true) {
            records.extend(table.remove_by_uuid(uuid));
        }
    }
    records
}

fn remove_if_present(path: &Path) -> Result<(), AssetError> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_merge() {
        let mut report = RefreshReport {
            added: 1,
            ..Default::default()
        };
        report.merge(RefreshReport {
            changed: 2,
            renamed: 1,
            ..Default::default()
        });
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn unconfigured_sources_are_rejected() {
        let mut db = AssetDatabase::new(
            AssetDatabaseConfig::default(),
            AssetTypeRegistry::with_builtin(),
            UuidRegistry::seeded(1),
        );
        assert!(matches!(
            db.refresh(SourceKind::Game, RefreshMode::Full),
            Err(AssetError::SourceNotConfigured(SourceKind::Game))
        ));
        assert!(matches!(
            db.build_vfs(&[SourceKind::Editor]),
            Err(AssetError::SourceNotConfigured(SourceKind::Editor))
        ));
        assert!(db.queued_feed(SourceKind::Runtime).is_err());
        assert!(db.get_asset_by_uuid(Uuid::EMPTY, false).is_none());
    }

    #[test]
    fn routing_strips_roots_and_skips_sidecars() {
        let mut source = VfsSource::new(SourceKind::Game);
        source.primary = Some(AssetTable::new("/game", PoolConfig::default()));
        source.database = Some(AssetTable::new("/game-db", PoolConfig::default()));

        let (root, record) = route(&source, ChangeRecord::create("/game-db/a.txt")).unwrap();
        assert_eq!(root, SourceRoot::Database);
        assert_eq!(record.path, Path::new("a.txt"));

        let (root, record) = route(&source, ChangeRecord::rename("/game/x.txt", "/game/y.txt")).unwrap();
        assert_eq!(root, SourceRoot::Primary);
        assert_eq!(record.destination.as_deref(), Some(Path::new("y.txt")));

        assert!(route(&source, ChangeRecord::create("a.txt.meta")).is_none());
        assert!(route(&source, ChangeRecord::create("/elsewhere/a.txt")).is_none());
    }
}
