//! Scene: game objects and their components
//!
//! Objects live in an [`IndexTable`] and are addressed externally by uuid.
//! Components live in one table per component kind and point back to their
//! owner by uuid, so there is no ownership cycle between the two.

mod component;
mod object;

pub use component::{Component, ComponentCell, ComponentKind};
pub use object::{ComponentEntry, GameObject};

use crate::handle::{Handle, IndexTable, TableError, VersionedRef};
use crate::pool::PoolConfig;
use crate::refs::{ComponentRef, ObjectRef, ObjectResolver};
use crate::uuid::{ObjectCategory, Uuid, UuidError, UuidRegistry};
use component::ComponentStore;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("object {0} not found")]
    ObjectNotFound(Uuid),

    #[error("uuid {0} is already in use")]
    UuidInUse(Uuid),

    #[error("the empty uuid cannot name an object")]
    EmptyUuid,

    #[error("component kind {kind} is registered to a type other than {name}")]
    KindCollision { kind: ComponentKind, name: &'static str },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Uuid(#[from] UuidError),
}

/// Object store for one scene.
///
/// The uuid registry is handed in at construction; the scene registers object
/// uuids in [`ObjectCategory`] and releases them when objects are destroyed.
pub struct Scene {
    objects: IndexTable<GameObject>,
    by_uuid: HashMap<Uuid, Handle>,
    components: ComponentStore,
    uuids: UuidRegistry,
}

impl Scene {
    pub fn new(config: PoolConfig, uuids: UuidRegistry) -> Self {
        Self {
            objects: IndexTable::new(config),
            by_uuid: HashMap::new(),
            components: ComponentStore::new(config),
            uuids,
        }
    }

    pub fn registry(&self) -> &UuidRegistry {
        &self.uuids
    }

    /// The object table, usable as a provider for [`VersionedRef`]s.
    pub fn objects(&self) -> &IndexTable<GameObject> {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Create an object with a freshly generated uuid.
    pub fn create_object(&mut self, name: impl Into<String>) -> Result<ObjectRef, SceneError> {
        let uuid = self.uuids.generate::<ObjectCategory>()?;
        match self.objects.pop_next(GameObject::new(uuid, name.into())) {
            Ok(handle) => {
                self.by_uuid.insert(uuid, handle);
                Ok(ObjectRef::new(uuid))
            }
            Err(err) => {
                self.uuids.remove::<ObjectCategory>(uuid);
                Err(err.into())
            }
        }
    }

    /// Recreate a saved object at its original table index with its original
    /// uuid.
    pub fn restore_object(
        &mut self,
        index: u32,
        uuid: Uuid,
        name: impl Into<String>,
    ) -> Result<ObjectRef, SceneError> {
        if uuid.is_empty() {
            return Err(SceneError::EmptyUuid);
        }
        if !self.uuids.add::<ObjectCategory>(uuid) {
            return Err(SceneError::UuidInUse(uuid));
        }
        match self
            .objects
            .try_reserve(index, GameObject::new(uuid, name.into()))
        {
            Ok(handle) => {
                self.by_uuid.insert(uuid, handle);
                Ok(ObjectRef::new(uuid))
            }
            Err(err) => {
                self.uuids.remove::<ObjectCategory>(uuid);
                Err(err.into())
            }
        }
    }

    /// Destroy an object and every component attached to it. Returns false if
    /// the object was already gone.
    pub fn destroy_object(&mut self, object: ObjectRef) -> bool {
        let uuid = object.uuid();
        let Some(handle) = self.by_uuid.remove(&uuid) else {
            return false;
        };
        if let Some(mut removed) = self.objects.remove(handle) {
            for entry in removed.drain_components() {
                self.components.remove(entry.kind, entry.handle);
            }
        }
        self.uuids.remove::<ObjectCategory>(uuid);
        true
    }

    pub fn uuid_is_in_use(&self, uuid: Uuid) -> bool {
        self.uuids.contains::<ObjectCategory>(uuid)
    }

    pub fn handle_of(&self, object: ObjectRef) -> Option<Handle> {
        self.by_uuid.get(&object.uuid()).copied()
    }

    pub fn get_by_uuid(&self, uuid: Uuid) -> Option<&GameObject> {
        self.objects.get(*self.by_uuid.get(&uuid)?)
    }

    pub fn get_by_uuid_mut(&mut self, uuid: Uuid) -> Option<&mut GameObject> {
        self.objects.get_mut(*self.by_uuid.get(&uuid)?)
    }

    pub fn object(&self, object: ObjectRef) -> Option<&GameObject> {
        self.get_by_uuid(object.uuid())
    }

    pub fn object_mut(&mut self, object: ObjectRef) -> Option<&mut GameObject> {
        self.get_by_uuid_mut(object.uuid())
    }

    /// Weak reference bound to the object's current handle, resolved against
    /// [`objects`](Self::objects).
    pub fn versioned_ref(&self, object: ObjectRef) -> VersionedRef<GameObject> {
        match self.handle_of(object) {
            Some(handle) => VersionedRef::bind(handle),
            None => VersionedRef::null(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.iter().map(|(_, object)| object)
    }

    pub fn add_component<T: Component>(
        &mut self,
        object: ObjectRef,
        value: T,
    ) -> Result<ComponentRef, SceneError> {
        let uuid = object.uuid();
        let owner = *self
            .by_uuid
            .get(&uuid)
            .ok_or(SceneError::ObjectNotFound(uuid))?;
        let handle = self.components.insert(object, value)?;
        match self.objects.get_mut(owner) {
            Some(target) => {
                let slot = target.attach(ComponentEntry {
                    kind: T::KIND,
                    handle,
                });
                Ok(ComponentRef::new(uuid, slot))
            }
            None => {
                self.components.remove(T::KIND, handle);
                Err(SceneError::ObjectNotFound(uuid))
            }
        }
    }

    pub fn component<T: Component>(&self, component: ComponentRef) -> Option<&T> {
        let entry = self.component_entry(component)?;
        if entry.kind != T::KIND {
            return None;
        }
        self.components
            .table::<T>()?
            .get(entry.handle)
            .map(|cell| &cell.value)
    }

    pub fn component_mut<T: Component>(&mut self, component: ComponentRef) -> Option<&mut T> {
        let entry = *self.component_entry(component)?;
        if entry.kind != T::KIND {
            return None;
        }
        self.components
            .table_mut::<T>()?
            .get_mut(entry.handle)
            .map(|cell| &mut cell.value)
    }

    /// First component of type `T` on `object`.
    pub fn find_component<T: Component>(&self, object: ObjectRef) -> Option<ComponentRef> {
        let slot = self.object(object)?.find(T::KIND)?;
        Some(ComponentRef::new(object.uuid(), slot))
    }

    pub fn remove_component(&mut self, component: ComponentRef) -> bool {
        let Some(target) = self.get_by_uuid_mut(component.owner().uuid()) else {
            return false;
        };
        match target.detach(component.slot()) {
            Some(entry) => self.components.remove(entry.kind, entry.handle),
            None => false,
        }
    }

    /// Resolve a component's back-reference to its owning object.
    pub fn owner_of(&self, component: ComponentRef) -> Option<ObjectRef> {
        let entry = self.component_entry(component)?;
        self.components.owner(entry.kind, entry.handle)
    }

    /// Compact object and component storage. Handles stay valid; versioned
    /// references re-resolve on their next lookup.
    pub fn compact(&mut self) -> usize {
        let moved = self.objects.compact() + self.components.compact();
        tracing::debug!("Scene compacted: {} objects moved, {} live", moved, self.objects.len());
        moved
    }

    fn component_entry(&self, component: ComponentRef) -> Option<&ComponentEntry> {
        self.get_by_uuid(component.owner().uuid())?
            .entry(component.slot())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(PoolConfig::default(), UuidRegistry::default())
    }
}

impl ObjectResolver for Scene {
    type Object = GameObject;
    type Component = ComponentEntry;

    fn object_by_uuid(&self, uuid: Uuid) -> Option<&GameObject> {
        self.get_by_uuid(uuid)
    }

    fn component_at(&self, owner: Uuid, slot: u32) -> Option<&ComponentEntry> {
        self.get_by_uuid(owner)?.entry(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Health {
        value: i32,
    }
    define_component!(Health, 1, "Health");

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(&'static str);
    define_component!(Tag, 2, "Tag");

    fn scene() -> Scene {
        Scene::new(
            PoolConfig {
                chunk_size: 4,
                growth_factor: 1.0,
            },
            UuidRegistry::seeded(11),
        )
    }

    #[test]
    fn destroy_releases_uuid() {
        let mut scene = scene();
        let obj = scene.create_object("X").unwrap();
        assert!(scene.uuid_is_in_use(obj.uuid()));
        assert!(scene.destroy_object(obj));
        assert!(!scene.uuid_is_in_use(obj.uuid()));
        assert!(obj.get(&scene).is_none());
        assert!(!scene.destroy_object(obj));
    }

    #[test]
    fn object_view_follows_scene_mutations() {
        let mut scene = scene();
        let gone = scene.create_object("gone").unwrap();
        let kept = scene.create_object("kept").unwrap();
        let kept_index = scene.handle_of(kept).map(|h| h.index()).unwrap();
        assert!(scene.destroy_object(gone));

        let objects = scene.objects();
        assert_eq!(objects.len(), 1);
        assert!(objects.is_index_used(kept_index));
        assert_eq!(scene.handle_of(gone), None);
        assert!(scene.uuid_is_in_use(kept.uuid()));
    }

    #[test]
    fn restored_object_reuses_index_and_stale_refs_stay_dead() {
        let mut scene = scene();
        let id = Uuid::from_u64(42);
        let obj = scene.restore_object(42, id, "answer").unwrap();
        assert_eq!(scene.get_by_uuid(id).map(GameObject::name), Some("answer"));

        let mut stale = scene.versioned_ref(obj);
        assert_eq!(stale.get(scene.objects()).map(GameObject::uuid), Some(id));

        assert!(scene.destroy_object(obj));
        assert!(!scene.objects().is_index_used(42));

        let again = scene
            .restore_object(42, Uuid::from_u64(43), "replacement")
            .unwrap();
        assert_eq!(scene.handle_of(again).map(|h| h.index()), Some(42));
        assert!(stale.get(scene.objects()).is_none());
    }

    #[test]
    fn restore_rejects_taken_uuid_and_index() {
        let mut scene = scene();
        let id = Uuid::from_u64(7);
        scene.restore_object(3, id, "a").unwrap();
        assert_eq!(
            scene.restore_object(4, id, "b").unwrap_err(),
            SceneError::UuidInUse(id)
        );
        let other = Uuid::from_u64(8);
        assert!(matches!(
            scene.restore_object(3, other, "c"),
            Err(SceneError::Table(TableError::AlreadyInUse { index: 3 }))
        ));
        // The failed reservation must not leak the uuid.
        assert!(!scene.uuid_is_in_use(other));
        assert_eq!(scene.restore_object(4, Uuid::EMPTY, "d"), Err(SceneError::EmptyUuid));
    }

    #[test]
    fn restore_rejects_index_past_ceiling() {
        let mut scene = scene();
        let id = Uuid::from_u64(9);
        assert!(matches!(
            scene.restore_object(u32::MAX - 1, id, "far"),
            Err(SceneError::Table(TableError::IndexOutOfRange { .. }))
        ));
        assert!(!scene.uuid_is_in_use(id));
        assert!(scene.is_empty());
        assert_eq!(scene.objects().high_water_mark(), 0);
    }

    #[test]
    fn components_resolve_and_point_back_to_owner() {
        let mut scene = scene();
        let obj = scene.create_object("hero").unwrap();
        let hp = scene.add_component(obj, Health { value: 10 }).unwrap();
        let tag = scene.add_component(obj, Tag("player")).unwrap();

        assert_eq!(scene.component::<Health>(hp), Some(&Health { value: 10 }));
        assert_eq!(scene.component::<Tag>(hp), None);
        assert_eq!(scene.find_component::<Tag>(obj), Some(tag));
        assert_eq!(scene.owner_of(tag), Some(obj));
        assert_eq!(tag.get(&scene).map(|e| e.kind), Some(2));

        scene.component_mut::<Health>(hp).unwrap().value -= 3;
        assert_eq!(scene.component::<Health>(hp).unwrap().value, 7);
    }

    #[test]
    fn removed_component_slot_is_not_reused() {
        let mut scene = scene();
        let obj = scene.create_object("box").unwrap();
        let first = scene.add_component(obj, Tag("a")).unwrap();
        assert!(scene.remove_component(first));
        assert!(!scene.remove_component(first));

        let second = scene.add_component(obj, Tag("b")).unwrap();
        assert_ne!(first.slot(), second.slot());
        assert_eq!(scene.component::<Tag>(first), None);
        assert_eq!(scene.object(obj).unwrap().component_count(), 1);
    }

    #[test]
    fn destroying_object_destroys_components() {
        let mut scene = scene();
        let a = scene.create_object("a").unwrap();
        let b = scene.create_object("b").unwrap();
        scene.add_component(a, Health { value: 1 }).unwrap();
        scene.add_component(a, Tag("a")).unwrap();
        let keep = scene.add_component(b, Health { value: 2 }).unwrap();
        assert_eq!(scene.component_count(), 3);

        scene.destroy_object(a);
        assert_eq!(scene.component_count(), 1);
        assert_eq!(scene.component::<Health>(keep).unwrap().value, 2);
        assert_eq!(
            scene.add_component(a, Tag("late")),
            Err(SceneError::ObjectNotFound(a.uuid()))
        );
    }

    #[test]
    fn compaction_keeps_refs_resolvable() {
        let mut scene = scene();
        let objs: Vec<_> = (0..10)
            .map(|i| scene.create_object(format!("o{i}")).unwrap())
            .collect();
        let mut last = scene.versioned_ref(objs[9]);
        for obj in &objs[..8] {
            scene.destroy_object(*obj);
        }
        scene.compact();

        assert_eq!(scene.len(), 2);
        assert_eq!(
            last.get(scene.objects()).map(GameObject::name),
            Some("o9")
        );
        assert_eq!(objs[8].get(&scene).map(GameObject::name), Some("o8"));
    }
}
