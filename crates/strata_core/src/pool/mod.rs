//! Pooled slot allocation
//!
//! Slots live in fixed-capacity chunks. A chunk is allocated once and never
//! reallocated, so references into it stay valid until the chunk itself is
//! released by `trim` or `clear(true)`.

mod chunk;
mod pool;

pub use chunk::Chunk;
pub use pool::SlotPool;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("failed to allocate a chunk of {slots} slots")]
    OutOfMemory { slots: usize },

    #[error("slot {index} is already in use")]
    SlotOccupied { index: usize },

    #[error("slot {index} is not in use")]
    SlotVacant { index: usize },

    #[error("slot {index} is outside pool capacity {capacity}")]
    IndexOutOfBounds { index: usize, capacity: usize },
}

/// Sizing policy shared by every pool built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots per chunk. Rounded up to a power of two.
    pub chunk_size: usize,
    /// Multiplier applied to the current capacity when the pool runs out of
    /// free slots. Values below 1.0 are treated as 1.0.
    pub growth_factor: f32,
}

impl PoolConfig {
    pub const DEFAULT_CHUNK_SIZE: usize = 64;
    pub const DEFAULT_GROWTH_FACTOR: f32 = 1.5;
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            growth_factor: Self::DEFAULT_GROWTH_FACTOR,
        }
    }
}
