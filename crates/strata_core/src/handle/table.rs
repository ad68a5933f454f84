// table.rs - Index table mapping small integer ids onto pool slots
//
// The table owns the id -> slot mapping, per-id generations and the free set.
// Values themselves live in the backing SlotPool.

use super::{Handle, RefProvider, ReleaseInbox, ReleaseQueue};
use crate::pool::{PoolConfig, PoolError, SlotPool};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("index {index} is already in use")]
    AlreadyInUse { index: u32 },

    #[error("index space exhausted")]
    IndexSpaceExhausted,

    #[error("index {index} is out of range (limit {limit})")]
    IndexOutOfRange { index: u32, limit: u32 },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    slot: Option<usize>,
    generation: u32,
}

/// Maps ids to pooled values with explicit reservation and free-list reuse.
///
/// Ids are claimed lowest-first, so a freed id is handed out again before the
/// table grows. Every structural change (free, compaction) bumps `version`,
/// which is what [`VersionedRef`](super::VersionedRef) watches.
///
/// Ids at or above `max_index` are refused, so a bogus id replayed from
/// saved state fails instead of sizing the table to it.
///
/// Single-writer: callers confine mutation to one thread.
pub struct IndexTable<T> {
    pool: SlotPool<T>,
    entries: Vec<Entry>,
    free: BTreeSet<u32>,
    version: u64,
    max_index: u32,
    released: ReleaseInbox,
}

impl<T> IndexTable<T> {
    pub const DEFAULT_MAX_INDEX: u32 = 1 << 20;

    pub fn new(config: PoolConfig) -> Self {
        Self {
            pool: SlotPool::new(config),
            entries: Vec::new(),
            free: BTreeSet::new(),
            version: 0,
            max_index: Self::DEFAULT_MAX_INDEX,
            released: ReleaseInbox::new(),
        }
    }

    /// Change the id ceiling. Ids already claimed are unaffected.
    pub fn with_max_index(mut self, max_index: u32) -> Self {
        self.max_index = max_index;
        self
    }

    pub fn max_index(&self) -> u32 {
        self.max_index
    }

    /// Number of ids in use.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// One past the highest id ever claimed.
    pub fn high_water_mark(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Structural version. Bumped on free and on compaction.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn pool(&self) -> &SlotPool<T> {
        &self.pool
    }

    /// Preallocate storage for `count` values.
    pub fn reserve(&mut self, count: usize) -> Result<(), TableError> {
        self.pool.reserve(count)?;
        Ok(())
    }

    /// Claim the lowest free id for `value`.
    pub fn pop_next(&mut self, value: T) -> Result<Handle, TableError> {
        self.reclaim();
        let index = match self.free.first() {
            Some(&index) => index,
            None => match u32::try_from(self.entries.len()) {
                Ok(index) if index < self.max_index => index,
                _ => return Err(TableError::IndexSpaceExhausted),
            },
        };
        self.claim(index, value)
    }

    /// Claim a specific id, e.g. when replaying saved state.
    pub fn try_reserve(&mut self, index: u32, value: T) -> Result<Handle, TableError> {
        self.reclaim();
        if self.is_index_used(index) {
            return Err(TableError::AlreadyInUse { index });
        }
        let handle = self.claim(index, value)?;
        tracing::debug!("Reserved explicit id {}", index);
        Ok(handle)
    }

    /// Free ids queued by dropped owning references. Returns how many were
    /// still current and got freed.
    pub fn reclaim(&mut self) -> usize {
        if self.released.is_empty() {
            return 0;
        }
        let pending: Vec<Handle> = self.released.drain().collect();
        pending
            .into_iter()
            .filter(|&handle| self.remove(handle).is_some())
            .count()
    }

    /// Release an id and invalidate every handle issued for it.
    pub fn mark_free(&mut self, index: u32) -> Option<T> {
        let entry = self.entries.get_mut(index as usize)?;
        let slot = entry.slot.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.insert(index);
        self.version += 1;
        self.pool.deallocate(slot)
    }

    /// Release the id behind `handle` if the handle is still current.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        self.mark_free(handle.index())
    }

    pub fn is_index_used(&self, index: u32) -> bool {
        self.entries
            .get(index as usize)
            .is_some_and(|entry| entry.slot.is_some())
    }

    /// True if `handle` refers to the current occupant of its id.
    pub fn contains(&self, handle: Handle) -> bool {
        self.entries
            .get(handle.index() as usize)
            .is_some_and(|entry| entry.slot.is_some() && entry.generation == handle.generation())
    }

    /// Current handle for a used id.
    pub fn handle_of(&self, index: u32) -> Option<Handle> {
        let entry = self.entries.get(index as usize)?;
        entry.slot.map(|_| Handle::new(index, entry.generation))
    }

    /// Look up by bare id, ignoring generations.
    pub fn get_at(&self, index: u32) -> Option<&T> {
        let slot = self.entries.get(index as usize)?.slot?;
        self.pool.get(slot)
    }

    pub fn get_at_mut(&mut self, index: u32) -> Option<&mut T> {
        let slot = self.entries.get(index as usize)?.slot?;
        self.pool.get_mut(slot)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.locate(handle)?;
        self.pool.get(slot)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.locate(handle)?;
        self.pool.get_mut(slot)
    }

    /// Iterate live values in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(move |(index, entry)| {
                let value = self.pool.get(entry.slot?)?;
                Some((Handle::new(index as u32, entry.generation), value))
            })
    }

    /// Move live values into the lowest free pool slots and release trailing
    /// chunks. Ids and generations are unchanged; slot locations are not.
    pub fn compact(&mut self) -> usize {
        self.reclaim();
        let live = self.pool.len();
        let mut moved = 0;
        for entry in self.entries.iter_mut() {
            let Some(slot) = entry.slot else { continue };
            if slot < live {
                continue;
            }
            let Some(target) = self.pool.first_free() else { break };
            if target >= slot {
                continue;
            }
            if self.pool.relocate(slot, target).is_ok() {
                entry.slot = Some(target);
                moved += 1;
            }
        }
        let released = self.pool.trim();
        if moved > 0 || released > 0 {
            self.version += 1;
            tracing::debug!("Index table compacted: {} moved, {} chunks released", moved, released);
        }
        moved
    }

    /// Free every id. Generations are bumped so outstanding handles go stale.
    pub fn clear(&mut self) {
        self.reclaim();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.slot.take().is_some() {
                entry.generation = entry.generation.wrapping_add(1);
            }
            self.free.insert(index as u32);
        }
        self.pool.clear(false);
        self.version += 1;
    }

    // Every fallible step runs before anything is modified.
    fn claim(&mut self, index: u32, value: T) -> Result<Handle, TableError> {
        if index >= self.max_index {
            return Err(TableError::IndexOutOfRange {
                index,
                limit: self.max_index,
            });
        }
        let position = index as usize;
        let grow = (position + 1).saturating_sub(self.entries.len());
        self.entries
            .try_reserve(grow)
            .map_err(|_| PoolError::OutOfMemory { slots: grow })?;
        let (slot, _) = self.pool.allocate(value)?;
        if grow > 0 {
            let start = self.entries.len() as u32;
            self.free.extend(start..index);
            self.entries.resize(position + 1, Entry::default());
        }
        self.free.remove(&index);
        let entry = &mut self.entries[position];
        entry.slot = Some(slot);
        Ok(Handle::new(index, entry.generation))
    }
}

impl<T> Default for IndexTable<T> {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl<T> RefProvider<T> for IndexTable<T> {
    fn version(&self) -> u64 {
        self.version
    }

    fn locate(&self, handle: Handle) -> Option<usize> {
        let entry = self.entries.get(handle.index() as usize)?;
        if entry.generation != handle.generation() {
            return None;
        }
        entry.slot
    }

    fn at_location(&self, location: usize) -> Option<&T> {
        self.pool.get(location)
    }

    fn at_location_mut(&mut self, location: usize) -> Option<&mut T> {
        self.pool.get_mut(location)
    }

    fn release(&mut self, handle: Handle) -> Option<T> {
        self.remove(handle)
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.released.queue()
    }
}
