//! Asset header signatures
//!
//! Every built-in asset kind starts with a 4-byte tag; external formats are
//! recognized by their own magic. Detection tries signatures longest-first and
//! matches a prefix of the input.

use crate::AssetError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetFormat {
    Pack,
    Material,
    Shader,
    Texture,
    RenderTexture,
    Atlas,
    Scene,
    Prefab,
    Text,
    Binary,
    Png,
    Bmp,
    Wav,
    Ogg,
    Gif,
}

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

impl AssetFormat {
    pub const ALL: [AssetFormat; 15] = [
        AssetFormat::Pack,
        AssetFormat::Material,
        AssetFormat::Shader,
        AssetFormat::Texture,
        AssetFormat::RenderTexture,
        AssetFormat::Atlas,
        AssetFormat::Scene,
        AssetFormat::Prefab,
        AssetFormat::Text,
        AssetFormat::Binary,
        AssetFormat::Png,
        AssetFormat::Bmp,
        AssetFormat::Wav,
        AssetFormat::Ogg,
        AssetFormat::Gif,
    ];

    /// Magic prefixes identifying this format.
    pub fn signatures(self) -> &'static [&'static [u8]] {
        match self {
            AssetFormat::Pack => &[b"PACK"],
            AssetFormat::Material => &[b"MATL"],
            AssetFormat::Shader => &[b"SHDR"],
            AssetFormat::Texture => &[b"TEXR"],
            AssetFormat::RenderTexture => &[b"RTEX"],
            AssetFormat::Atlas => &[b"ATLS"],
            AssetFormat::Scene => &[b"SCNE"],
            AssetFormat::Prefab => &[b"PRFB"],
            AssetFormat::Text => &[b"TEXT"],
            AssetFormat::Binary => &[b"BLOB"],
            AssetFormat::Png => &[PNG_MAGIC],
            AssetFormat::Bmp => &[b"BM"],
            AssetFormat::Wav => &[b"RIFF"],
            AssetFormat::Ogg => &[b"OggS"],
            AssetFormat::Gif => &[b"GIF89a", b"GIF87a"],
        }
    }

    /// Engine-defined formats carry a header the engine writes itself.
    pub fn is_builtin(self) -> bool {
        !matches!(
            self,
            AssetFormat::Png | AssetFormat::Bmp | AssetFormat::Wav | AssetFormat::Ogg | AssetFormat::Gif
        )
    }

    /// Header written in front of a built-in asset's payload.
    pub fn header(self) -> Option<&'static [u8]> {
        if self.is_builtin() {
            self.signatures().first().copied()
        } else {
            None
        }
    }

    /// Identify the format from the start of a file.
    pub fn sniff(bytes: &[u8]) -> Result<AssetFormat, AssetError> {
        SIGNATURES
            .iter()
            .find(|(magic, _)| bytes.starts_with(magic))
            .map(|&(_, format)| format)
            .ok_or(AssetError::UnknownFormat)
    }

    /// Read just enough of `reader` to identify the format.
    pub fn sniff_reader<R: Read>(reader: R) -> Result<AssetFormat, AssetError> {
        let mut head = Vec::with_capacity(*MAX_SIGNATURE_LEN);
        reader
            .take(*MAX_SIGNATURE_LEN as u64)
            .read_to_end(&mut head)?;
        Self::sniff(&head)
    }

    /// Fallback for headerless files.
    pub fn from_path(path: &Path) -> Option<AssetFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let format = match ext.as_str() {
            "txt" | "md" | "json" | "toml" | "ron" | "csv" => AssetFormat::Text,
            "png" => AssetFormat::Png,
            "bmp" => AssetFormat::Bmp,
            "wav" => AssetFormat::Wav,
            "ogg" => AssetFormat::Ogg,
            "gif" => AssetFormat::Gif,
            "bin" => AssetFormat::Binary,
            _ => return None,
        };
        Some(format)
    }
}

/// All signatures, longest first. Ties keep declaration order.
static SIGNATURES: Lazy<Vec<(&'static [u8], AssetFormat)>> = Lazy::new(|| {
    let mut table: Vec<_> = AssetFormat::ALL
        .iter()
        .flat_map(|&format| format.signatures().iter().map(move |&magic| (magic, format)))
        .collect();
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    table
});

static MAX_SIGNATURE_LEN: Lazy<usize> =
    Lazy::new(|| SIGNATURES.first().map_or(0, |(magic, _)| magic.len()));
