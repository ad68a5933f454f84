// component.rs - Component kinds and per-kind storage
//
// Components are identified by u32 kinds, not Rust TypeIds. Each kind gets its
// own IndexTable; the table is looked up by kind and downcast once per call.

use super::SceneError;
use crate::handle::{Handle, IndexTable};
use crate::pool::PoolConfig;
use crate::refs::ObjectRef;
use std::any::Any;
use std::collections::HashMap;

pub type ComponentKind = u32;

/// Data that can be attached to a scene object.
pub trait Component: 'static {
    /// Globally unique component kind.
    const KIND: ComponentKind;

    /// Human-readable name for debugging.
    const NAME: &'static str;
}

/// Helper macro to implement Component trait.
///
/// # Example
/// ```ignore
/// struct Health { value: i32 }
///
/// define_component!(Health, 1, "Health");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $kind:expr, $name:expr) => {
        impl $crate::scene::Component for $ty {
            const KIND: $crate::scene::ComponentKind = $kind;
            const NAME: &'static str = $name;
        }
    };
}

/// Stored component value plus the uuid of the object that owns it.
pub struct ComponentCell<T> {
    pub owner: ObjectRef,
    pub value: T,
}

/// Kind-erased operations the scene needs without knowing `T`.
trait ErasedTable {
    fn remove(&mut self, handle: Handle) -> bool;
    fn owner(&self, handle: Handle) -> Option<ObjectRef>;
    fn compact(&mut self) -> usize;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedTable for IndexTable<ComponentCell<T>> {
    fn remove(&mut self, handle: Handle) -> bool {
        IndexTable::remove(self, handle).is_some()
    }

    fn owner(&self, handle: Handle) -> Option<ObjectRef> {
        self.get(handle).map(|cell| cell.owner)
    }

    fn compact(&mut self) -> usize {
        IndexTable::compact(self)
    }

    fn len(&self) -> usize {
        IndexTable::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) struct ComponentStore {
    config: PoolConfig,
    tables: HashMap<ComponentKind, Box<dyn ErasedTable>>,
}

impl ComponentStore {
    pub(crate) fn new(config: PoolConfig) -> Self {
        Self {
            config,
            tables: HashMap::new(),
        }
    }

    pub(crate) fn table<T: Component>(&self) -> Option<&IndexTable<ComponentCell<T>>> {
        self.tables.get(&T::KIND)?.as_any().downcast_ref()
    }

    pub(crate) fn table_mut<T: Component>(&mut self) -> Option<&mut IndexTable<ComponentCell<T>>> {
        self.tables.get_mut(&T::KIND)?.as_any_mut().downcast_mut()
    }

    pub(crate) fn insert<T: Component>(
        &mut self,
        owner: ObjectRef,
        value: T,
    ) -> Result<Handle, SceneError> {
        let config = self.config;
        let table = self
            .tables
            .entry(T::KIND)
            .or_insert_with(|| Box::new(IndexTable::<ComponentCell<T>>::new(config)));
        match table.as_any_mut().downcast_mut::<IndexTable<ComponentCell<T>>>() {
            Some(table) => Ok(table.pop_next(ComponentCell { owner, value })?),
            None => {
                tracing::error!("Component kind {} ({}) collides with another type", T::KIND, T::NAME);
                Err(SceneError::KindCollision {
                    kind: T::KIND,
                    name: T::NAME,
                })
            }
        }
    }

    pub(crate) fn remove(&mut self, kind: ComponentKind, handle: Handle) -> bool {
        self.tables
            .get_mut(&kind)
            .is_some_and(|table| table.remove(handle))
    }

    pub(crate) fn owner(&self, kind: ComponentKind, handle: Handle) -> Option<ObjectRef> {
        self.tables.get(&kind)?.owner(handle)
    }

    pub(crate) fn compact(&mut self) -> usize {
        self.tables.values_mut().map(|table| table.compact()).sum()
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.values().map(|table| table.len()).sum()
    }
}
