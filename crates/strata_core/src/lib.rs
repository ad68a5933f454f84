//! Strata Core
//!
//! Contains the identity and storage layer the rest of the engine builds on:
//! - Chunked slot pools with stable addresses
//! - Index tables handing out generational handles
//! - Versioned weak references
//! - Per-category uuid registry
//! - Opaque object/component/asset refs
//! - Scene object and component storage
//!
//! Everything here is single-writer. Callers keep mutation on one thread.

pub mod handle;
pub mod pool;
pub mod refs;
pub mod scene;
pub mod uuid;

pub use handle::{Handle, IndexTable, RefProvider, ReleaseQueue, TableError, VersionedRef};
pub use pool::{PoolConfig, PoolError, SlotPool};
pub use refs::{AssetRef, AssetResolver, ComponentRef, ObjectRef, ObjectResolver};
pub use scene::{Component, ComponentKind, GameObject, Scene, SceneError};
pub use uuid::{Uuid, UuidCategory, UuidConfig, UuidError, UuidRegistry};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
