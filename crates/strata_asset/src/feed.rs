// feed.rs - File change feeds consumed by incremental refresh
//
// A feed only reports what changed; the database decides what to do with it.
// Paths in records are relative to the watched root.

use crate::info::{AssetMeta, FileEntry};
use crate::AssetError;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    None,
    Rename,
    Delete,
    Create,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub path: PathBuf,
    /// New location for renames.
    pub destination: Option<PathBuf>,
}

impl ChangeRecord {
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self::simple(ChangeKind::Create, path)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::simple(ChangeKind::Modified, path)
    }

    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self::simple(ChangeKind::Delete, path)
    }

    pub fn rename(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Rename,
            path: from.into(),
            destination: Some(to.into()),
        }
    }

    fn simple(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            destination: None,
        }
    }
}

/// Source of change records for one root.
pub trait ChangeFeed: Send {
    /// Append pending records to `out`, returning how many were added.
    fn poll(&mut self, out: &mut Vec<ChangeRecord>) -> Result<usize, AssetError>;
}

/// Producer half of a [`QueuedFeed`]. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct ChangeSender {
    tx: Sender<ChangeRecord>,
}

impl ChangeSender {
    /// Queue a record. Returns false and drops it when the queue is full.
    pub fn send(&self, record: ChangeRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                tracing::warn!("Change queue full, dropping {:?} {}", record.kind, record.path.display());
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Bounded queue fed by an external watcher.
#[derive(Debug)]
pub struct QueuedFeed {
    rx: Receiver<ChangeRecord>,
}

pub fn queued_feed(capacity: usize) -> (ChangeSender, QueuedFeed) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (ChangeSender { tx }, QueuedFeed { rx })
}

impl ChangeFeed for QueuedFeed {
    fn poll(&mut self, out: &mut Vec<ChangeRecord>) -> Result<usize, AssetError> {
        let before = out.len();
        out.extend(self.rx.try_iter());
        Ok(out.len() - before)
    }
}

/// Polling feed: rescans the root and diffs against the previous scan.
///
/// Renames show up as a delete plus a create.
#[derive(Debug)]
pub struct ScanFeed {
    root: PathBuf,
    snapshot: BTreeMap<PathBuf, FileEntry>,
}

impl ScanFeed {
    /// Start watching `root`; the current contents count as already seen.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let root = root.into();
        let snapshot = scan_dir(&root)?;
        Ok(Self { root, snapshot })
    }
}

impl ChangeFeed for ScanFeed {
    fn poll(&mut self, out: &mut Vec<ChangeRecord>) -> Result<usize, AssetError> {
        let current = scan_dir(&self.root)?;
        let before = out.len();

        for (path, entry) in &current {
            match self.snapshot.get(path) {
                None => out.push(ChangeRecord::create(path)),
                Some(old) if old.differs(entry) => out.push(ChangeRecord::modified(path)),
                Some(_) => {}
            }
        }
        for path in self.snapshot.keys() {
            if !current.contains_key(path) {
                out.push(ChangeRecord::delete(path));
            }
        }

        self.snapshot = current;
        Ok(out.len() - before)
    }
}

/// All asset files under `root`, keyed by relative path. Sidecars are skipped.
///
/// A missing root scans as empty.
pub fn scan_dir(root: &Path) -> Result<BTreeMap<PathBuf, FileEntry>, AssetError> {
    let mut files = BTreeMap::new();
    if !root.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() || AssetMeta::is_sidecar(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let meta = entry.metadata()?;
        files.insert(
            relative.to_path_buf(),
            FileEntry {
                path: entry.path().to_path_buf(),
                size: meta.len(),
                modified: meta.modified().ok(),
            },
        );
    }
    Ok(files)
}
