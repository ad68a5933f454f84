//! Asset type registry
//!
//! Each asset type is described by a table of plain function pointers
//! (allocate, serialize, deserialize, destroy) keyed by a stable `u32` id.
//! Loaded values are stored type-erased and downcast on access.

use crate::format::AssetFormat;
use crate::AssetError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;

/// Stable asset type id. Survives across builds, unlike `TypeId`.
pub type AssetTypeId = u32;

/// Type-erased asset payload.
pub type AnyAsset = dyn Any + Send + Sync;

/// A Rust type that can live in the asset database.
pub trait Asset: Send + Sync + 'static {
    const TYPE: AssetTypeId;
    const NAME: &'static str;
}

#[derive(Clone, Copy)]
pub struct AssetVTable {
    pub name: &'static str,
    pub allocate: fn() -> Box<AnyAsset>,
    pub serialize: fn(&AnyAsset, &mut Vec<u8>) -> Result<(), AssetError>,
    pub deserialize: fn(&[u8]) -> Result<Box<AnyAsset>, AssetError>,
    pub destroy: fn(Box<AnyAsset>),
}

impl std::fmt::Debug for AssetVTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetVTable").field("name", &self.name).finish()
    }
}

/// A live asset value tagged with its type id.
pub struct LoadedAsset {
    type_id: AssetTypeId,
    data: Box<AnyAsset>,
}

impl LoadedAsset {
    pub fn new<T: Asset>(value: T) -> Self {
        Self {
            type_id: T::TYPE,
            data: Box::new(value),
        }
    }

    pub fn asset_type(&self) -> AssetTypeId {
        self.type_id
    }

    pub fn downcast_ref<T: Asset>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }

    pub fn downcast_mut<T: Asset>(&mut self) -> Option<&mut T> {
        self.data.downcast_mut()
    }

    pub fn as_any(&self) -> &AnyAsset {
        &*self.data
    }
}

/// Maps asset type ids to their vtables and file formats to type ids.
#[derive(Debug, Default)]
pub struct AssetTypeRegistry {
    types: HashMap<AssetTypeId, AssetVTable>,
    formats: HashMap<AssetFormat, AssetTypeId>,
}

impl AssetTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`TextAsset`] and [`BlobAsset`] registered and bound.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.types.insert(TextAsset::TYPE, TextAsset::VTABLE);
        registry.types.insert(BlobAsset::TYPE, BlobAsset::VTABLE);
        registry.formats.insert(AssetFormat::Text, TextAsset::TYPE);
        registry.formats.insert(AssetFormat::Binary, BlobAsset::TYPE);
        registry
    }

    pub fn register(&mut self, id: AssetTypeId, vtable: AssetVTable) -> Result<(), AssetError> {
        if self.types.contains_key(&id) {
            return Err(AssetError::TypeAlreadyRegistered(id));
        }
        tracing::debug!("Registered asset type {} ({})", id, vtable.name);
        self.types.insert(id, vtable);
        Ok(())
    }

    /// Register `T` with a JSON body.
    pub fn register_json<T>(&mut self) -> Result<(), AssetError>
    where
        T: Asset + Serialize + DeserializeOwned + Default,
    {
        self.register(
            T::TYPE,
            AssetVTable {
                name: T::NAME,
                allocate: allocate_default::<T>,
                serialize: serialize_json::<T>,
                deserialize: deserialize_json::<T>,
                destroy: drop,
            },
        )
    }

    /// Route files of `format` to asset type `id`.
    pub fn bind_format(&mut self, format: AssetFormat, id: AssetTypeId) -> Result<(), AssetError> {
        if !self.types.contains_key(&id) {
            return Err(AssetError::UnknownAssetType(id));
        }
        self.formats.insert(format, id);
        Ok(())
    }

    pub fn contains(&self, id: AssetTypeId) -> bool {
        self.types.contains_key(&id)
    }

    pub fn vtable(&self, id: AssetTypeId) -> Result<&AssetVTable, AssetError> {
        self.types.get(&id).ok_or(AssetError::UnknownAssetType(id))
    }

    /// Type for a detected format. Unbound or unknown formats load as blobs.
    pub fn type_for_format(&self, format: Option<AssetFormat>) -> AssetTypeId {
        format
            .and_then(|format| self.formats.get(&format).copied())
            .unwrap_or(BlobAsset::TYPE)
    }

    pub fn allocate(&self, id: AssetTypeId) -> Result<LoadedAsset, AssetError> {
        let vtable = self.vtable(id)?;
        Ok(LoadedAsset {
            type_id: id,
            data: (vtable.allocate)(),
        })
    }

    pub fn serialize(&self, asset: &LoadedAsset, out: &mut Vec<u8>) -> Result<(), AssetError> {
        let vtable = self.vtable(asset.type_id)?;
        (vtable.serialize)(&*asset.data, out)
    }

    pub fn deserialize(&self, id: AssetTypeId, bytes: &[u8]) -> Result<LoadedAsset, AssetError> {
        let vtable = self.vtable(id)?;
        Ok(LoadedAsset {
            type_id: id,
            data: (vtable.deserialize)(bytes)?,
        })
    }

    pub fn destroy(&self, asset: LoadedAsset) {
        match self.types.get(&asset.type_id) {
            Some(vtable) => (vtable.destroy)(asset.data),
            None => drop(asset),
        }
    }
}

fn allocate_default<T: Asset + Default>() -> Box<AnyAsset> {
    Box::new(T::default())
}

fn expect_type<T: Asset>(value: &AnyAsset) -> Result<&T, AssetError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| AssetError::Serializer(format!("value is not a {}", T::NAME)))
}

fn serialize_json<T: Asset + Serialize>(value: &AnyAsset, out: &mut Vec<u8>) -> Result<(), AssetError> {
    serde_json::to_writer_pretty(out, expect_type::<T>(value)?)
        .map_err(|err| AssetError::Serializer(err.to_string()))
}

fn deserialize_json<T: Asset + DeserializeOwned>(bytes: &[u8]) -> Result<Box<AnyAsset>, AssetError> {
    let value: T =
        serde_json::from_slice(bytes).map_err(|err| AssetError::Serializer(err.to_string()))?;
    Ok(Box::new(value))
}

fn strip_header(bytes: &[u8], format: AssetFormat) -> &[u8] {
    match format.header() {
        Some(header) => bytes.strip_prefix(header).unwrap_or(bytes),
        None => bytes,
    }
}

/// UTF-8 text. Written with a `TEXT` header, read with or without one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextAsset {
    pub text: String,
}

impl Asset for TextAsset {
    const TYPE: AssetTypeId = 1;
    const NAME: &'static str = "text";
}

impl TextAsset {
    const VTABLE: AssetVTable = AssetVTable {
        name: Self::NAME,
        allocate: allocate_default::<TextAsset>,
        serialize: Self::write,
        deserialize: Self::read,
        destroy: drop,
    };

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn write(value: &AnyAsset, out: &mut Vec<u8>) -> Result<(), AssetError> {
        let asset = expect_type::<Self>(value)?;
        out.extend_from_slice(AssetFormat::Text.header().unwrap_or_default());
        out.extend_from_slice(asset.text.as_bytes());
        Ok(())
    }

    fn read(bytes: &[u8]) -> Result<Box<AnyAsset>, AssetError> {
        let body = strip_header(bytes, AssetFormat::Text);
        let text = std::str::from_utf8(body)
            .map_err(|err| AssetError::Serializer(err.to_string()))?;
        Ok(Box::new(Self::new(text)))
    }
}

/// Opaque bytes. Anything without a registered type lands here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobAsset {
    pub bytes: Vec<u8>,
}

impl Asset for BlobAsset {
    const TYPE: AssetTypeId = 2;
    const NAME: &'static str = "blob";
}

impl BlobAsset {
    const VTABLE: AssetVTable = AssetVTable {
        name: Self::NAME,
        allocate: allocate_default::<BlobAsset>,
        serialize: Self::write,
        deserialize: Self::read,
        destroy: drop,
    };

    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    fn write(value: &AnyAsset, out: &mut Vec<u8>) -> Result<(), AssetError> {
        let asset = expect_type::<Self>(value)?;
        out.extend_from_slice(AssetFormat::Binary.header().unwrap_or_default());
        out.extend_from_slice(&asset.bytes);
        Ok(())
    }

    // Foreign files (png, wav...) are kept verbatim.
    fn read(bytes: &[u8]) -> Result<Box<AnyAsset>, AssetError> {
        Ok(Box::new(Self::new(strip_header(bytes, AssetFormat::Binary))))
    }
}
