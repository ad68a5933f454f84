//! Random 64-bit identifiers and per-category uniqueness tracking

mod registry;

pub use registry::{
    AssetCategory, CategoryId, ObjectCategory, UuidCategory, UuidConfig, UuidRegistry,
};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UuidError {
    #[error("no unique id left in category {category} after {attempts} attempts")]
    Exhausted { category: CategoryId, attempts: u32 },

    #[error("invalid uuid text '{input}'")]
    Parse { input: String },
}

/// Identifier drawn at random and kept unique within its category.
///
/// Text form is 16 lowercase hex digits; binary form is 8 little-endian bytes.
/// Zero is reserved as the empty id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uuid(u64);

impl Uuid {
    pub const EMPTY: Uuid = Uuid(0);

    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uuid({self})")
    }
}

impl FromStr for Uuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(UuidError::Parse { input: s.to_string() });
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| UuidError::Parse { input: s.to_string() })
    }
}

impl Serialize for Uuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Uuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UuidVisitor;

        impl Visitor<'_> for UuidVisitor {
            type Value = Uuid;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a hex uuid string or an unsigned integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Uuid, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Uuid, E> {
                Ok(Uuid(v))
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_any(UuidVisitor)
        } else {
            deserializer.deserialize_u64(UuidVisitor)
        }
    }
}
