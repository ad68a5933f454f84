//! Opaque references
//!
//! Copyable, serializable identifiers for objects, components and assets.
//! They carry uuids only and resolve through whichever registry currently owns
//! the uuid binding (the active scene, the asset database). Nothing is cached,
//! so a ref stays meaningful across reloads as long as the binding is
//! re-established.

use crate::uuid::Uuid;
use serde::{Deserialize, Serialize};

/// Translates object and component refs into live values.
pub trait ObjectResolver {
    type Object;
    type Component;

    fn object_by_uuid(&self, uuid: Uuid) -> Option<&Self::Object>;

    fn component_at(&self, owner: Uuid, slot: u32) -> Option<&Self::Component>;
}

/// Translates asset refs into live values.
pub trait AssetResolver {
    type Asset;

    fn asset_by_uuid(&self, uuid: Uuid, prefer_database: bool) -> Option<&Self::Asset>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ObjectRef {
    uuid: Uuid,
}

impl ObjectRef {
    pub const NULL: ObjectRef = ObjectRef { uuid: Uuid::EMPTY };

    pub const fn new(uuid: Uuid) -> Self {
        Self { uuid }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn is_null(&self) -> bool {
        self.uuid.is_empty()
    }

    pub fn get<'a, R: ObjectResolver>(&self, resolver: &'a R) -> Option<&'a R::Object> {
        if self.is_null() {
            return None;
        }
        resolver.object_by_uuid(self.uuid)
    }
}

/// Component addressed by its owner's uuid plus its slot within the owner.
/// The owner link is a uuid, never a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComponentRef {
    owner: Uuid,
    slot: u32,
}

impl ComponentRef {
    pub const fn new(owner: Uuid, slot: u32) -> Self {
        Self { owner, slot }
    }

    pub fn owner(&self) -> ObjectRef {
        ObjectRef::new(self.owner)
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn is_null(&self) -> bool {
        self.owner.is_empty()
    }

    pub fn get<'a, R: ObjectResolver>(&self, resolver: &'a R) -> Option<&'a R::Component> {
        if self.is_null() {
            return None;
        }
        resolver.component_at(self.owner, self.slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AssetRef {
    uuid: Uuid,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    from_database: bool,
}

impl AssetRef {
    pub const NULL: AssetRef = AssetRef {
        uuid: Uuid::EMPTY,
        from_database: false,
    };

    pub const fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            from_database: false,
        }
    }

    /// Ref that prefers the database root over the primary root.
    pub const fn from_database(uuid: Uuid) -> Self {
        Self {
            uuid,
            from_database: true,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn prefers_database(&self) -> bool {
        self.from_database
    }

    pub fn is_null(&self) -> bool {
        self.uuid.is_empty()
    }

    pub fn get<'a, R: AssetResolver>(&self, resolver: &'a R) -> Option<&'a R::Asset> {
        if self.is_null() {
            return None;
        }
        resolver.asset_by_uuid(self.uuid, self.from_database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Names(HashMap<Uuid, &'static str>);

    impl ObjectResolver for Names {
        type Object = &'static str;
        type Component = &'static str;

        fn object_by_uuid(&self, uuid: Uuid) -> Option<&&'static str> {
            self.0.get(&uuid)
        }

        fn component_at(&self, owner: Uuid, slot: u32) -> Option<&&'static str> {
            (slot == 0).then(|| self.0.get(&owner)).flatten()
        }
    }

    #[test]
    fn refs_resolve_through_the_resolver() {
        let id = Uuid::from_u64(5);
        let mut names = Names(HashMap::new());
        names.0.insert(id, "player");

        let obj = ObjectRef::new(id);
        assert_eq!(obj.get(&names), Some(&"player"));
        assert_eq!(ComponentRef::new(id, 0).get(&names), Some(&"player"));
        assert_eq!(ComponentRef::new(id, 1).get(&names), None);

        names.0.clear();
        assert_eq!(obj.get(&names), None);
        assert_eq!(obj.uuid(), id);
    }

    #[test]
    fn null_refs_never_resolve() {
        let mut names = Names(HashMap::new());
        names.0.insert(Uuid::EMPTY, "ghost");
        assert_eq!(ObjectRef::NULL.get(&names), None);
        assert!(ComponentRef::default().is_null());
    }

    #[test]
    fn asset_ref_serializes_flag_only_when_set() {
        let plain = AssetRef::new(Uuid::from_u64(1));
        let json = serde_json::to_string(&plain).unwrap();
        assert_eq!(json, r#"{"uuid":"0000000000000001"}"#);

        let db = AssetRef::from_database(Uuid::from_u64(1));
        let json = serde_json::to_string(&db).unwrap();
        let back: AssetRef = serde_json::from_str(&json).unwrap();
        assert!(back.prefers_database());
        assert_eq!(back, db);
    }
}
