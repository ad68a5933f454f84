//! Generational handles and the tables that hand them out
//!
//! A handle is a small index into an [`IndexTable`] plus the generation the
//! table held for that index when the handle was issued. Freeing an index bumps
//! its generation, so stale handles stop resolving instead of aliasing the
//! next occupant.

mod table;
mod versioned;

pub use table::{IndexTable, TableError};
pub use versioned::{RefProvider, ReleaseInbox, ReleaseQueue, VersionedRef};

use serde::{Deserialize, Serialize};

/// Handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in the owning table
/// - Generation: Incremented each time the index is freed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}
