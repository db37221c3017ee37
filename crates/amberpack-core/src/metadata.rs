//! Per-resource metadata records and the closed type/codec enumerations.

use crate::error::{PackageError, Result};

/// Stable 32-bit resource identifier: FNV-1a-32 of the logical name.
/// 0 means "invalid / not found".
pub type AssetId = u32;

/// The reserved invalid [`AssetId`].
pub const INVALID_ASSET_ID: AssetId = 0;

/// On-disk size of one metadata record: 4 id + 4 type + 8 offset + 8 size +
/// 256 name + 4 flags + 4 compression + 8 original_size + 32 hash +
/// 16 reserved.
pub const METADATA_SIZE: usize = 344;

/// Fixed size of the NUL-terminated name field.
pub const NAME_FIELD_LEN: usize = 256;

/// Bit 0 of `flags`: payload is stored compressed.
pub const FLAG_COMPRESSED: u32 = 1 << 0;

/// Resource classification carried in each metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResourceType {
    Unknown = 0,
    Texture2d = 1,
    TextureCube = 2,
    Model = 3,
    Material = 4,
    Shader = 5,
    Sound = 6,
    Animation = 7,
    ParticleSystem = 8,
    Script = 9,
}

impl ResourceType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ResourceType::Unknown),
            1 => Some(ResourceType::Texture2d),
            2 => Some(ResourceType::TextureCube),
            3 => Some(ResourceType::Model),
            4 => Some(ResourceType::Material),
            5 => Some(ResourceType::Shader),
            6 => Some(ResourceType::Sound),
            7 => Some(ResourceType::Animation),
            8 => Some(ResourceType::ParticleSystem),
            9 => Some(ResourceType::Script),
            _ => None,
        }
    }

    /// Infer a type from a file extension (without the leading dot),
    /// case-insensitively. Unrecognized extensions yield `Unknown`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "bmp" | "tga" | "dds" | "ktx2" => ResourceType::Texture2d,
            "obj" | "fbx" | "gltf" | "glb" | "mdl" => ResourceType::Model,
            "mat" | "mtl" => ResourceType::Material,
            "hlsl" | "glsl" | "vert" | "frag" | "comp" | "shader" => ResourceType::Shader,
            "wav" | "mp3" | "ogg" | "flac" => ResourceType::Sound,
            "anim" | "animation" => ResourceType::Animation,
            "particle" | "psys" => ResourceType::ParticleSystem,
            "lua" | "py" | "js" | "script" => ResourceType::Script,
            _ => ResourceType::Unknown,
        }
    }
}

/// Payload compression codec.
///
/// Only `None` and `Deflate` are implemented; the remaining values are
/// recognized on disk but fail at dispatch with `UnsupportedCodec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CompressionType {
    None = 0,
    Deflate = 1,
    Lz4 = 2,
    Zstd = 3,
    Bc7 = 4,
    Astc = 5,
}

impl CompressionType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Deflate),
            2 => Some(CompressionType::Lz4),
            3 => Some(CompressionType::Zstd),
            4 => Some(CompressionType::Bc7),
            5 => Some(CompressionType::Astc),
            _ => None,
        }
    }
}

/// Fixed-size on-disk record describing one resource within a package.
///
/// The `name` is held decoded in memory and re-encoded into the fixed
/// 256-byte NUL-terminated field on write. Encoding clips names longer
/// than [`NAME_FIELD_LEN`]` - 1` bytes at a character boundary; the packer
/// rejects such names up front so clipping only affects hand-built
/// records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// FNV-1a-32 of `name`. Advisory on disk; the manager recomputes it.
    pub id: AssetId,

    /// Resource classification.
    pub resource_type: ResourceType,

    /// Byte offset from the start of the file to the payload.
    pub offset: u64,

    /// Payload byte length as stored (post-compression).
    pub size: u64,

    /// Logical name, unique per package.
    pub name: String,

    /// Bit flags; see [`FLAG_COMPRESSED`].
    pub flags: u32,

    /// Payload codec.
    pub compression: CompressionType,

    /// Pre-compression byte length.
    pub original_size: u64,

    /// Content hash of the stored bytes: FNV-1a-64 rendered as 16 lowercase
    /// hex digits, NUL-terminated. Cache/identity use only, not
    /// collision-resistant.
    pub hash: [u8; 32],
}

impl ResourceMetadata {
    /// Whether the stored payload is compressed.
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    /// The content hash field up to its NUL terminator, as a string.
    pub fn hash_str(&self) -> &str {
        let end = self.hash.iter().position(|&b| b == 0).unwrap_or(32);
        // The field is written from a hex rendering, so this cannot fail on
        // records we produced; treat garbage as an empty hash.
        std::str::from_utf8(&self.hash[..end]).unwrap_or("")
    }

    /// Serialize the record to its on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(METADATA_SIZE);

        bytes.extend_from_slice(&self.id.to_le_bytes());
        bytes.extend_from_slice(&(self.resource_type as u32).to_le_bytes());
        bytes.extend_from_slice(&self.offset.to_le_bytes());
        bytes.extend_from_slice(&self.size.to_le_bytes());

        let mut name_field = [0u8; NAME_FIELD_LEN];
        let name_bytes = self.name.as_bytes();
        // All fields are public, so an oversized name can reach this point;
        // clip it at a character boundary so the field stays NUL-terminated
        // valid UTF-8.
        let mut name_len = name_bytes.len().min(NAME_FIELD_LEN - 1);
        while name_len > 0 && !self.name.is_char_boundary(name_len) {
            name_len -= 1;
        }
        name_field[..name_len].copy_from_slice(&name_bytes[..name_len]);
        bytes.extend_from_slice(&name_field);

        bytes.extend_from_slice(&self.flags.to_le_bytes());
        bytes.extend_from_slice(&(self.compression as u32).to_le_bytes());
        bytes.extend_from_slice(&self.original_size.to_le_bytes());
        bytes.extend_from_slice(&self.hash);
        bytes.extend_from_slice(&[0u8; 16]);

        bytes
    }

    /// Deserialize a record from its on-disk form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < METADATA_SIZE {
            return Err(PackageError::TruncatedPackage(format!(
                "Metadata record requires {} bytes, got {}",
                METADATA_SIZE,
                bytes.len()
            )));
        }

        let id = u32::from_le_bytes(bytes[0..4].try_into().unwrap());

        let raw_type = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let resource_type = ResourceType::from_u32(raw_type).ok_or_else(|| {
            PackageError::TruncatedPackage(format!("Unknown resource type value: {}", raw_type))
        })?;

        let offset = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        let size = u64::from_le_bytes(bytes[16..24].try_into().unwrap());

        let name_field = &bytes[24..24 + NAME_FIELD_LEN];
        let name_end = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_FIELD_LEN);
        let name = std::str::from_utf8(&name_field[..name_end])
            .map_err(|_| {
                PackageError::TruncatedPackage("Resource name is not valid UTF-8".into())
            })?
            .to_string();

        let flags = u32::from_le_bytes(bytes[280..284].try_into().unwrap());

        let raw_compression = u32::from_le_bytes(bytes[284..288].try_into().unwrap());
        let compression = CompressionType::from_u32(raw_compression)
            .ok_or(PackageError::UnknownCodec(raw_compression))?;

        let original_size = u64::from_le_bytes(bytes[288..296].try_into().unwrap());

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[296..328]);

        Ok(ResourceMetadata {
            id,
            resource_type,
            offset,
            size,
            name,
            flags,
            compression,
            original_size,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResourceMetadata {
        ResourceMetadata {
            id: 0x4F9F2CAB,
            resource_type: ResourceType::Script,
            offset: 396,
            size: 5,
            name: "hello".to_string(),
            flags: 0,
            compression: CompressionType::None,
            original_size: 5,
            hash: crate::hash::content_hash(b"Hello"),
        }
    }

    #[test]
    fn test_metadata_size() {
        assert_eq!(sample().to_bytes().len(), METADATA_SIZE);
    }

    #[test]
    fn test_metadata_round_trip() {
        let meta = sample();
        let decoded = ResourceMetadata::from_bytes(&meta.to_bytes()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_name_field_nul_terminated() {
        let bytes = sample().to_bytes();
        // Name starts at offset 24: "hello" then zero padding.
        assert_eq!(&bytes[24..29], b"hello");
        assert!(bytes[29..280].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_oversized_name_clipped_on_encode() {
        let mut meta = sample();
        meta.name = "n".repeat(NAME_FIELD_LEN + 40);

        let bytes = meta.to_bytes();
        assert_eq!(bytes.len(), METADATA_SIZE);
        // The field keeps its NUL terminator and the decoded name is the
        // clipped prefix.
        assert_eq!(bytes[24 + NAME_FIELD_LEN - 1], 0);
        let decoded = ResourceMetadata::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.name.len(), NAME_FIELD_LEN - 1);
    }

    #[test]
    fn test_oversized_name_clipped_at_char_boundary() {
        let mut meta = sample();
        // 2-byte characters positioned so the 255-byte cut lands mid-char.
        meta.name = "é".repeat(NAME_FIELD_LEN);

        let bytes = meta.to_bytes();
        let decoded = ResourceMetadata::from_bytes(&bytes).unwrap();
        assert!(decoded.name.len() <= NAME_FIELD_LEN - 1);
        assert!(decoded.name.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_unknown_resource_type_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            ResourceMetadata::from_bytes(&bytes),
            Err(PackageError::TruncatedPackage(_))
        ));
    }

    #[test]
    fn test_unknown_codec_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[284..288].copy_from_slice(&42u32.to_le_bytes());
        assert!(matches!(
            ResourceMetadata::from_bytes(&bytes),
            Err(PackageError::UnknownCodec(42))
        ));
    }

    #[test]
    fn test_type_detection_case_insensitive() {
        assert_eq!(ResourceType::from_extension("PNG"), ResourceType::Texture2d);
        assert_eq!(ResourceType::from_extension("Gltf"), ResourceType::Model);
        assert_eq!(ResourceType::from_extension("frag"), ResourceType::Shader);
        assert_eq!(ResourceType::from_extension("OGG"), ResourceType::Sound);
        assert_eq!(ResourceType::from_extension("lua"), ResourceType::Script);
        assert_eq!(ResourceType::from_extension("txt"), ResourceType::Unknown);
    }

    #[test]
    fn test_compression_type_conversion() {
        assert_eq!(CompressionType::from_u32(0), Some(CompressionType::None));
        assert_eq!(CompressionType::from_u32(1), Some(CompressionType::Deflate));
        assert_eq!(CompressionType::from_u32(5), Some(CompressionType::Astc));
        assert_eq!(CompressionType::from_u32(6), None);
    }

    #[test]
    fn test_compressed_flag() {
        let mut meta = sample();
        assert!(!meta.is_compressed());
        meta.flags |= FLAG_COMPRESSED;
        assert!(meta.is_compressed());
    }

    #[test]
    fn test_hash_str() {
        let meta = sample();
        assert_eq!(meta.hash_str(), "63f0bfacf2c00f6b");
    }
}
