use super::PoolError;

/// Fixed-capacity block of slots.
///
/// The slot buffer is boxed once at construction and never resized, so the
/// address of every slot is stable for the lifetime of the chunk.
pub struct Chunk<T> {
    slots: Box<[Option<T>]>,
    used: usize,
}

impl<T> Chunk<T> {
    /// Allocate a chunk of `slots` empty slots, reporting allocator failure
    /// instead of aborting.
    pub fn try_with_capacity(slots: usize) -> Result<Self, PoolError> {
        let mut buf: Vec<Option<T>> = Vec::new();
        buf.try_reserve_exact(slots)
            .map_err(|_| PoolError::OutOfMemory { slots })?;
        buf.resize_with(slots, || None);
        Ok(Self {
            slots: buf.into_boxed_slice(),
            used: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.used == self.capacity()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[inline]
    pub fn is_used(&self, idx: usize) -> bool {
        matches!(self.slots.get(idx), Some(Some(_)))
    }

    /// Lowest free slot in this chunk.
    pub fn first_free(&self) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        self.slots.iter().position(Option::is_none)
    }

    /// Store `value` in a free slot. Callers check occupancy first.
    pub fn put(&mut self, idx: usize, value: T) -> &mut T {
        debug_assert!(self.slots[idx].is_none(), "slot {idx} already in use");
        self.used += 1;
        self.slots[idx].insert(value)
    }

    pub fn take(&mut self, idx: usize) -> Option<T> {
        let value = self.slots.get_mut(idx)?.take()?;
        self.used -= 1;
        Some(value)
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.slots.get_mut(idx)?.as_mut()
    }

    /// Drop every value while keeping the slot memory.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.used = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|value| (idx, value)))
    }
}
