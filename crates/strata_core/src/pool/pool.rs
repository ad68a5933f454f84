use super::{Chunk, PoolConfig, PoolError};

/// Chunked slot pool that hides individual chunks and acts like a sparse array.
///
/// Growth always appends whole chunks; existing chunks are never reallocated,
/// so a live slot keeps its address until it is deallocated or its chunk is
/// released.
pub struct SlotPool<T> {
    chunk_size: usize,
    shift: u32,
    mask: usize,
    growth_factor: f32,
    chunks: Vec<Chunk<T>>,
    len: usize,
}

impl<T> SlotPool<T> {
    pub fn new(config: PoolConfig) -> Self {
        let chunk_size = config.chunk_size.max(1).next_power_of_two();
        Self {
            chunk_size,
            shift: chunk_size.trailing_zeros(),
            mask: chunk_size - 1,
            growth_factor: config.growth_factor.max(1.0),
            chunks: Vec::new(),
            len: 0,
        }
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self::new(PoolConfig {
            chunk_size,
            ..PoolConfig::default()
        })
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn growth_factor(&self) -> f32 {
        self.growth_factor
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total number of slots across all chunks.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.chunk_size
    }

    /// Number of slots in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn chunk_of(&self, index: usize) -> usize {
        index >> self.shift
    }

    #[inline]
    fn local_of(&self, index: usize) -> usize {
        index & self.mask
    }

    /// Lowest free slot index, if any chunk has room.
    pub fn first_free(&self) -> Option<usize> {
        self.chunks.iter().enumerate().find_map(|(cid, chunk)| {
            chunk
                .first_free()
                .map(|local| (cid << self.shift) | local)
        })
    }

    /// Claim the lowest free slot for `value`, growing the pool when every
    /// slot is taken.
    pub fn allocate(&mut self, value: T) -> Result<(usize, &mut T), PoolError> {
        let index = match self.first_free() {
            Some(index) => index,
            None => {
                let start = self.capacity();
                self.grow()?;
                start
            }
        };
        let slot = self.place(index, value);
        Ok((index, slot))
    }

    /// Claim a specific slot, appending chunks until it exists.
    pub fn allocate_at(&mut self, index: usize, value: T) -> Result<&mut T, PoolError> {
        if self.is_used(index) {
            return Err(PoolError::SlotOccupied { index });
        }
        let end = index.checked_add(1).ok_or(PoolError::IndexOutOfBounds {
            index,
            capacity: self.capacity(),
        })?;
        self.reserve(end)?;
        Ok(self.place(index, value))
    }

    /// Mark a slot free. Chunk memory is kept for reuse.
    pub fn deallocate(&mut self, index: usize) -> Option<T> {
        let cid = self.chunk_of(index);
        let local = self.local_of(index);
        let value = self.chunks.get_mut(cid)?.take(local)?;
        self.len -= 1;
        Some(value)
    }

    /// Move a live value into a free slot. Used by compaction.
    pub fn relocate(&mut self, from: usize, to: usize) -> Result<(), PoolError> {
        if to >= self.capacity() {
            return Err(PoolError::IndexOutOfBounds {
                index: to,
                capacity: self.capacity(),
            });
        }
        if self.is_used(to) {
            return Err(PoolError::SlotOccupied { index: to });
        }
        let value = self
            .deallocate(from)
            .ok_or(PoolError::SlotVacant { index: from })?;
        self.place(to, value);
        Ok(())
    }

    /// Preallocate chunks so that at least `slots` slots exist.
    pub fn reserve(&mut self, slots: usize) -> Result<(), PoolError> {
        while self.capacity() < slots {
            self.push_chunk()?;
        }
        Ok(())
    }

    /// Release trailing chunks that hold no live slot. Returns the number of
    /// chunks released.
    pub fn trim(&mut self) -> usize {
        let before = self.chunks.len();
        while self.chunks.last().is_some_and(Chunk::is_empty) {
            self.chunks.pop();
        }
        let released = before - self.chunks.len();
        if released > 0 {
            tracing::debug!("Slot pool trimmed {} chunks, capacity now {}", released, self.capacity());
        }
        released
    }

    /// Mark every slot free. With `full`, chunk memory is released as well.
    pub fn clear(&mut self, full: bool) {
        if full {
            self.chunks.clear();
        } else {
            for chunk in &mut self.chunks {
                chunk.clear();
            }
        }
        self.len = 0;
    }

    #[inline]
    pub fn is_used(&self, index: usize) -> bool {
        self.chunks
            .get(self.chunk_of(index))
            .is_some_and(|chunk| chunk.is_used(self.local_of(index)))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.chunks
            .get(self.chunk_of(index))?
            .get(self.local_of(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let local = self.local_of(index);
        let cid = self.chunk_of(index);
        self.chunks.get_mut(cid)?.get_mut(local)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        let shift = self.shift;
        self.chunks.iter().enumerate().flat_map(move |(cid, chunk)| {
            chunk
                .iter()
                .map(move |(local, value)| ((cid << shift) | local, value))
        })
    }

    fn place(&mut self, index: usize, value: T) -> &mut T {
        let cid = self.chunk_of(index);
        let local = self.local_of(index);
        self.len += 1;
        self.chunks[cid].put(local, value)
    }

    fn grow(&mut self) -> Result<(), PoolError> {
        let current = self.capacity();
        let scaled = (current as f64 * f64::from(self.growth_factor)).ceil() as usize;
        let target = scaled.max(current + self.chunk_size);
        self.reserve(target)?;
        tracing::debug!(
            "Slot pool grown from {} to {} slots ({} chunks)",
            current,
            self.capacity(),
            self.chunks.len()
        );
        Ok(())
    }

    fn push_chunk(&mut self) -> Result<(), PoolError> {
        self.chunks
            .try_reserve(1)
            .map_err(|_| PoolError::OutOfMemory {
                slots: self.chunk_size,
            })?;
        let chunk = Chunk::try_with_capacity(self.chunk_size)?;
        self.chunks.push(chunk);
        Ok(())
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_survive_growth() {
        let mut pool = SlotPool::with_chunk_size(4);
        let mut seen = Vec::new();
        for i in 0..4u32 {
            let (index, slot) = pool.allocate(i).unwrap();
            seen.push((index, slot as *const u32));
        }
        assert_eq!(pool.chunk_count(), 1);

        // Fill several more chunks.
        for i in 4..40u32 {
            pool.allocate(i).unwrap();
        }
        assert!(pool.chunk_count() > 1);

        for (index, addr) in seen {
            assert!(std::ptr::eq(pool.get(index).unwrap(), addr));
        }
    }

    #[test]
    fn deallocated_slot_is_reused_before_growth() {
        let mut pool = SlotPool::with_chunk_size(4);
        for i in 0..4 {
            pool.allocate(i).unwrap();
        }
        assert_eq!(pool.deallocate(1), Some(1));
        assert!(!pool.is_used(1));

        let (index, _) = pool.allocate(99).unwrap();
        assert_eq!(index, 1);
        assert_eq!(pool.chunk_count(), 1);
        assert_eq!(pool.get(1), Some(&99));
    }

    #[test]
    fn growth_applies_factor() {
        let mut pool = SlotPool::new(PoolConfig {
            chunk_size: 4,
            growth_factor: 3.0,
        });
        for i in 0..5 {
            pool.allocate(i).unwrap();
        }
        // 0 -> 4 (one chunk minimum), then 4 * 3.0 = 12.
        assert_eq!(pool.capacity(), 12);
    }

    #[test]
    fn growth_factor_below_one_is_clamped() {
        let pool: SlotPool<u8> = SlotPool::new(PoolConfig {
            chunk_size: 3,
            growth_factor: 0.25,
        });
        assert_eq!(pool.growth_factor(), 1.0);
        assert_eq!(pool.chunk_size(), 4);
    }

    #[test]
    fn reserve_prevents_later_growth() {
        let mut pool = SlotPool::with_chunk_size(8);
        pool.reserve(20).unwrap();
        assert_eq!(pool.chunk_count(), 3);
        for i in 0..24 {
            pool.allocate(i).unwrap();
        }
        assert_eq!(pool.chunk_count(), 3);
    }

    #[test]
    fn trim_releases_only_trailing_empty_chunks() {
        let mut pool = SlotPool::with_chunk_size(2);
        for i in 0..6 {
            pool.allocate(i).unwrap();
        }
        assert_eq!(pool.chunk_count(), 3);

        // Empty the middle chunk; it is not trailing so it stays.
        pool.deallocate(2);
        pool.deallocate(3);
        assert_eq!(pool.trim(), 0);

        pool.deallocate(4);
        pool.deallocate(5);
        assert_eq!(pool.trim(), 2);
        assert_eq!(pool.chunk_count(), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn clear_keeps_or_releases_memory() {
        let mut pool = SlotPool::with_chunk_size(4);
        for i in 0..6 {
            pool.allocate(i).unwrap();
        }
        pool.clear(false);
        assert!(pool.is_empty());
        assert_eq!(pool.chunk_count(), 2);
        assert_eq!(pool.get(0), None);

        pool.clear(true);
        assert_eq!(pool.chunk_count(), 0);
        assert_eq!(pool.capacity(), 0);
    }

    #[test]
    fn allocate_at_rejects_occupied_slot() {
        let mut pool = SlotPool::with_chunk_size(4);
        pool.allocate_at(9, "nine").unwrap();
        assert_eq!(pool.chunk_count(), 3);
        assert_eq!(
            pool.allocate_at(9, "again").unwrap_err(),
            PoolError::SlotOccupied { index: 9 }
        );
        // Lower slots stay free for regular allocation.
        assert_eq!(pool.allocate("zero").unwrap().0, 0);
    }

    #[test]
    fn relocate_moves_value() {
        let mut pool = SlotPool::with_chunk_size(4);
        for i in 0..3 {
            pool.allocate(i).unwrap();
        }
        pool.deallocate(0);
        pool.relocate(2, 0).unwrap();
        assert_eq!(pool.get(0), Some(&2));
        assert!(!pool.is_used(2));
        assert_eq!(
            pool.relocate(2, 1).unwrap_err(),
            PoolError::SlotOccupied { index: 1 }
        );
    }

    #[test]
    fn iter_yields_live_slots_in_order() {
        let mut pool = SlotPool::with_chunk_size(2);
        for i in 0..5 {
            pool.allocate(i * 10).unwrap();
        }
        pool.deallocate(3);
        let live: Vec<_> = pool.iter().map(|(i, v)| (i, *v)).collect();
        assert_eq!(live, vec![(0, 0), (1, 10), (2, 20), (4, 40)]);
    }

    #[test]
    fn allocate_at_last_index_is_rejected() {
        let mut pool = SlotPool::with_chunk_size(4);
        pool.allocate('a').unwrap();
        assert_eq!(
            pool.allocate_at(usize::MAX, 'z').unwrap_err(),
            PoolError::IndexOutOfBounds {
                index: usize::MAX,
                capacity: 4,
            }
        );
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.chunk_count(), 1);
    }
}
