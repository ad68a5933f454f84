// source.rs - Asset sources and their per-root tables

use crate::feed::ChangeFeed;
use crate::info::AssetInfo;
use crate::AssetError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use strata_core::{Handle, IndexTable, PoolConfig, Uuid};

/// Where an asset comes from. Later kinds shadow earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    BuiltIn,
    Editor,
    Game,
    Runtime,
    Override,
}

impl SourceKind {
    pub const COUNT: usize = 5;

    pub const ALL: [SourceKind; Self::COUNT] = [
        SourceKind::BuiltIn,
        SourceKind::Editor,
        SourceKind::Game,
        SourceKind::Runtime,
        SourceKind::Override,
    ];

    /// Lookup order, highest precedence first.
    pub const PRECEDENCE: [SourceKind; Self::COUNT] = [
        SourceKind::Override,
        SourceKind::Runtime,
        SourceKind::Game,
        SourceKind::Editor,
        SourceKind::BuiltIn,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::BuiltIn => "built-in",
            SourceKind::Editor => "editor",
            SourceKind::Game => "game",
            SourceKind::Runtime => "runtime",
            SourceKind::Override => "override",
        }
    }
}

/// One configured source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub root: PathBuf,
    /// Optional root holding imported database copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_root: Option<PathBuf>,
    /// Attach a polling feed after the first full refresh.
    #[serde(default)]
    pub watch: bool,
}

impl SourceConfig {
    pub fn new(kind: SourceKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
            database_root: None,
            watch: false,
        }
    }

    pub fn with_database(mut self, root: impl Into<PathBuf>) -> Self {
        self.database_root = Some(root.into());
        self
    }

    pub fn watched(mut self) -> Self {
        self.watch = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRoot {
    Primary,
    Database,
}

/// Assets found under one root directory.
///
/// Records live in an [`IndexTable`]; uuid and path maps point at their handles.
pub struct AssetTable {
    root: PathBuf,
    infos: IndexTable<AssetInfo>,
    by_uuid: HashMap<Uuid, Handle>,
    by_path: BTreeMap<PathBuf, Handle>,
}

impl AssetTable {
    pub fn new(root: impl Into<PathBuf>, pool: PoolConfig) -> Self {
        Self {
            root: root.into(),
            infos: IndexTable::new(pool),
            by_uuid: HashMap::new(),
            by_path: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a root-relative path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Root-relative form of `path`. Relative input is returned as is.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn insert(&mut self, info: AssetInfo) -> Result<Handle, AssetError> {
        if self.by_path.contains_key(info.path()) {
            return Err(AssetError::PathInUse(info.path().to_path_buf()));
        }
        let uuid = info.uuid();
        let path = info.path().to_path_buf();
        let handle = self.infos.pop_next(info)?;
        self.by_uuid.insert(uuid, handle);
        self.by_path.insert(path, handle);
        Ok(handle)
    }

    pub fn remove_by_path(&mut self, path: &Path) -> Option<AssetInfo> {
        let handle = self.by_path.remove(path)?;
        let info = self.infos.remove(handle)?;
        self.by_uuid.remove(&info.uuid());
        Some(info)
    }

    pub fn remove_by_uuid(&mut self, uuid: Uuid) -> Option<AssetInfo> {
        let handle = self.by_uuid.remove(&uuid)?;
        let info = self.infos.remove(handle)?;
        self.by_path.remove(info.path());
        Some(info)
    }

    /// Move a record to a new relative path, keeping its uuid.
    pub fn rename(&mut self, from: &Path, to: &Path) -> Result<Option<Uuid>, AssetError> {
        if self.by_path.contains_key(to) {
            return Err(AssetError::PathInUse(to.to_path_buf()));
        }
        let Some(handle) = self.by_path.remove(from) else {
            return Ok(None);
        };
        self.by_path.insert(to.to_path_buf(), handle);
        let Some(info) = self.infos.get_mut(handle) else {
            return Ok(None);
        };
        info.set_path(to.to_path_buf());
        Ok(Some(info.uuid()))
    }

    pub fn contains_uuid(&self, uuid: Uuid) -> bool {
        self.by_uuid.contains_key(&uuid)
    }

    pub fn get_by_uuid(&self, uuid: Uuid) -> Option<&AssetInfo> {
        self.infos.get(*self.by_uuid.get(&uuid)?)
    }

    pub fn get_by_uuid_mut(&mut self, uuid: Uuid) -> Option<&mut AssetInfo> {
        self.infos.get_mut(*self.by_uuid.get(&uuid)?)
    }

    pub fn get_by_path(&self, path: &Path) -> Option<&AssetInfo> {
        self.infos.get(*self.by_path.get(path)?)
    }

    pub fn get_by_path_mut(&mut self, path: &Path) -> Option<&mut AssetInfo> {
        self.infos.get_mut(*self.by_path.get(path)?)
    }

    /// Records in path order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetInfo> {
        self.by_path.values().filter_map(|&handle| self.infos.get(handle))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.by_path.keys().map(PathBuf::as_path)
    }

    /// Uuids of records whose status matches `pred`.
    pub(crate) fn uuids_where(&self, pred: impl Fn(&AssetInfo) -> bool) -> Vec<Uuid> {
        self.iter().filter(|info| pred(info)).map(AssetInfo::uuid).collect()
    }
}

impl std::fmt::Debug for AssetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetTable")
            .field("root", &self.root)
            .field("len", &self.len())
            .finish()
    }
}

/// One source: a primary root, an optional database root and a change feed.
pub struct VfsSource {
    kind: SourceKind,
    pub(crate) primary: Option<AssetTable>,
    pub(crate) database: Option<AssetTable>,
    pub(crate) feed: Option<Box<dyn ChangeFeed>>,
}

impl VfsSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            primary: None,
            database: None,
            feed: None,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_configured(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_feed(&self) -> bool {
        self.feed.is_some()
    }

    pub fn table(&self, root: SourceRoot) -> Option<&AssetTable> {
        match root {
            SourceRoot::Primary => self.primary.as_ref(),
            SourceRoot::Database => self.database.as_ref(),
        }
    }

    pub(crate) fn table_mut(&mut self, root: SourceRoot) -> Option<&mut AssetTable> {
        match root {
            SourceRoot::Primary => self.primary.as_mut(),
            SourceRoot::Database => self.database.as_mut(),
        }
    }

    /// Roots in search order.
    pub fn search_order(prefer_database: bool) -> [SourceRoot; 2] {
        if prefer_database {
            [SourceRoot::Database, SourceRoot::Primary]
        } else {
            [SourceRoot::Primary, SourceRoot::Database]
        }
    }

    pub fn find(&self, uuid: Uuid, prefer_database: bool) -> Option<(SourceRoot, &AssetInfo)> {
        Self::search_order(prefer_database)
            .into_iter()
            .find_map(|root| Some((root, self.table(root)?.get_by_uuid(uuid)?)))
    }

    pub fn contains_uuid(&self, uuid: Uuid) -> bool {
        self.find(uuid, false).is_some()
    }

    pub fn len(&self) -> usize {
        self.primary.as_ref().map_or(0, AssetTable::len)
            + self.database.as_ref().map_or(0, AssetTable::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for VfsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VfsSource")
            .field("kind", &self.kind)
            .field("primary", &self.primary)
            .field("database", &self.database)
            .field("feed", &self.feed.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(uuid: u64, path: &str) -> AssetInfo {
        AssetInfo::new(Uuid::from_u64(uuid), path)
    }

    #[test]
    fn precedence_is_the_reverse_of_declaration() {
        let mut reversed = SourceKind::ALL;
        reversed.reverse();
        assert_eq!(reversed, SourceKind::PRECEDENCE);
        assert_eq!(SourceKind::Override.index(), 4);
        assert_eq!(SourceKind::BuiltIn.name(), "built-in");
    }

    #[test]
    fn table_indexes_by_uuid_and_path() {
        let mut table = AssetTable::new("/assets", PoolConfig::default());
        table.insert(info(1, "a.txt")).unwrap();
        table.insert(info(2, "b.txt")).unwrap();
        assert!(matches!(
            table.insert(info(3, "a.txt")),
            Err(AssetError::PathInUse(_))
        ));

        assert_eq!(table.get_by_path(Path::new("b.txt")).unwrap().uuid(), Uuid::from_u64(2));
        assert_eq!(table.relative(Path::new("/assets/x/y.txt")), Path::new("x/y.txt"));

        let removed = table.remove_by_uuid(Uuid::from_u64(1)).unwrap();
        assert_eq!(removed.path(), Path::new("a.txt"));
        assert!(table.get_by_path(Path::new("a.txt")).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rename_keeps_uuid() {
        let mut table = AssetTable::new("/assets", PoolConfig::default());
        table.insert(info(7, "old.txt")).unwrap();
        table.insert(info(8, "taken.txt")).unwrap();

        let moved = table.rename(Path::new("old.txt"), Path::new("new.txt")).unwrap();
        assert_eq!(moved, Some(Uuid::from_u64(7)));
        assert_eq!(
            table.get_by_uuid(Uuid::from_u64(7)).unwrap().path(),
            Path::new("new.txt")
        );
        assert!(table.rename(Path::new("new.txt"), Path::new("taken.txt")).is_err());
        assert_eq!(table.rename(Path::new("nope"), Path::new("x")).unwrap(), None);
    }

    #[test]
    fn source_search_respects_database_preference() {
        let mut source = VfsSource::new(SourceKind::Game);
        let mut primary = AssetTable::new("/game", PoolConfig::default());
        let mut database = AssetTable::new("/game-db", PoolConfig::default());
        primary.insert(info(5, "hero.txt")).unwrap();
        database.insert(info(5, "hero.txt")).unwrap();
        source.primary = Some(primary);
        source.database = Some(database);

        assert_eq!(source.find(Uuid::from_u64(5), false).unwrap().0, SourceRoot::Primary);
        assert_eq!(source.find(Uuid::from_u64(5), true).unwrap().0, SourceRoot::Database);
        assert!(source.find(Uuid::from_u64(6), true).is_none());
        assert_eq!(source.len(), 2);
    }
}
