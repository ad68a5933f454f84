use super::ComponentKind;
use crate::handle::Handle;
use crate::refs::ObjectRef;
use crate::uuid::Uuid;

/// Link from an object to one of its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentEntry {
    pub kind: ComponentKind,
    pub handle: Handle,
}

/// Scene object. Owns nothing but its name and the links to its components.
///
/// Component slots are append-only: a removed component leaves an empty slot
/// behind so that outstanding `ComponentRef`s never alias a newer component.
#[derive(Debug, Clone)]
pub struct GameObject {
    uuid: Uuid,
    name: String,
    active: bool,
    components: Vec<Option<ComponentEntry>>,
}

impl GameObject {
    pub(crate) fn new(uuid: Uuid, name: String) -> Self {
        Self {
            uuid,
            name,
            active: true,
            components: Vec::new(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.uuid)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Number of attached components.
    pub fn component_count(&self) -> usize {
        self.components.iter().flatten().count()
    }

    pub fn entry(&self, slot: u32) -> Option<&ComponentEntry> {
        self.components.get(slot as usize)?.as_ref()
    }

    /// Attached components with their slots.
    pub fn components(&self) -> impl Iterator<Item = (u32, &ComponentEntry)> {
        self.components
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|e| (slot as u32, e)))
    }

    /// First slot holding a component of `kind`.
    pub fn find(&self, kind: ComponentKind) -> Option<u32> {
        self.components()
            .find(|(_, entry)| entry.kind == kind)
            .map(|(slot, _)| slot)
    }

    pub(crate) fn attach(&mut self, entry: ComponentEntry) -> u32 {
        self.components.push(Some(entry));
        (self.components.len() - 1) as u32
    }

    pub(crate) fn detach(&mut self, slot: u32) -> Option<ComponentEntry> {
        self.components.get_mut(slot as usize)?.take()
    }

    pub(crate) fn drain_components(&mut self) -> impl Iterator<Item = ComponentEntry> + '_ {
        self.components.drain(..).flatten()
    }
}
