// registry.rs - Per-category uuid uniqueness sets
//
// Categories are identified by u32 ids, not Rust TypeIds, so a category keeps
// the same identity across builds and across the scripting boundary.

use super::{Uuid, UuidError};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type CategoryId = u32;

/// Namespace for uuids. The same value may be live in two categories at once.
pub trait UuidCategory: 'static {
    /// Stable category id.
    const ID: CategoryId;

    /// Human-readable name for diagnostics.
    const NAME: &'static str;
}

/// Declare a uuid category marker type.
///
/// # Example
/// ```ignore
/// define_uuid_category!(pub SoundBankCategory, 10, "sound-bank");
/// ```
#[macro_export]
macro_rules! define_uuid_category {
    ($vis:vis $ty:ident, $id:expr, $name:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis struct $ty;

        impl $crate::uuid::UuidCategory for $ty {
            const ID: $crate::uuid::CategoryId = $id;
            const NAME: &'static str = $name;
        }
    };
}

define_uuid_category!(pub ObjectCategory, 1, "object");
define_uuid_category!(pub AssetCategory, 2, "asset");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UuidConfig {
    /// Fixed generator seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Draws attempted before generation gives up.
    pub max_attempts: u32,
}

impl UuidConfig {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100_000;
}

impl Default for UuidConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Seeded uuid generator plus one uniqueness set per category.
///
/// Constructed explicitly and handed to whatever needs ids; there is no
/// process-wide instance.
pub struct UuidRegistry {
    rng: ChaCha8Rng,
    max_attempts: u32,
    categories: HashMap<CategoryId, HashSet<Uuid>>,
}

impl UuidRegistry {
    pub fn new(config: UuidConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rng,
            max_attempts: config.max_attempts,
            categories: HashMap::new(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(UuidConfig {
            seed: Some(seed),
            ..UuidConfig::default()
        })
    }

    pub fn generate<C: UuidCategory>(&mut self) -> Result<Uuid, UuidError> {
        self.generate_in(C::ID)
    }

    /// Draw ids until one is neither empty nor already registered in
    /// `category`, then register it.
    pub fn generate_in(&mut self, category: CategoryId) -> Result<Uuid, UuidError> {
        let set = self.categories.entry(category).or_default();
        for _ in 0..self.max_attempts {
            let candidate = Uuid::from_u64(self.rng.next_u64());
            if candidate.is_empty() || set.contains(&candidate) {
                continue;
            }
            set.insert(candidate);
            return Ok(candidate);
        }
        tracing::warn!(
            "Uuid generation for category {} gave up after {} attempts",
            category,
            self.max_attempts
        );
        Err(UuidError::Exhausted {
            category,
            attempts: self.max_attempts,
        })
    }

    pub fn add<C: UuidCategory>(&mut self, uuid: Uuid) -> bool {
        self.add_in(C::ID, uuid)
    }

    /// Register an existing id. Returns false if it was empty or already taken.
    pub fn add_in(&mut self, category: CategoryId, uuid: Uuid) -> bool {
        if uuid.is_empty() {
            return false;
        }
        self.categories.entry(category).or_default().insert(uuid)
    }

    pub fn remove<C: UuidCategory>(&mut self, uuid: Uuid) -> bool {
        self.remove_in(C::ID, uuid)
    }

    /// Unregister an id. Removing the empty id does nothing.
    pub fn remove_in(&mut self, category: CategoryId, uuid: Uuid) -> bool {
        if uuid.is_empty() {
            return false;
        }
        self.categories
            .get_mut(&category)
            .is_some_and(|set| set.remove(&uuid))
    }

    pub fn contains<C: UuidCategory>(&self, uuid: Uuid) -> bool {
        self.contains_in(C::ID, uuid)
    }

    pub fn contains_in(&self, category: CategoryId, uuid: Uuid) -> bool {
        self.categories
            .get(&category)
            .is_some_and(|set| set.contains(&uuid))
    }

    pub fn len<C: UuidCategory>(&self) -> usize {
        self.len_in(C::ID)
    }

    pub fn len_in(&self, category: CategoryId) -> usize {
        self.categories.get(&category).map_or(0, HashSet::len)
    }
}

impl Default for UuidRegistry {
    fn default() -> Self {
        Self::new(UuidConfig::default())
    }
}
