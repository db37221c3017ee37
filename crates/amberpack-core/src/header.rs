use crate::error::{PackageError, Result};

pub const MAGIC: [u8; 8] = *b"AMBPKG01";

/// On-disk size of the header: 8 magic + 4 version + 4 resource_count +
/// 8 total_size + 8 create_time + 4 checksum + 16 reserved.
pub const HEADER_SIZE: usize = 52;

/// Package file header.
///
/// Occupies the first [`HEADER_SIZE`] bytes of a package. The checksum
/// covers every byte of the file *after* this header (metadata table and
/// payload region). All integers are little-endian and the struct is
/// serialized field-by-field; the in-memory layout is never written as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageHeader {
    /// Magic bytes: `"AMBPKG01"`.
    pub magic: [u8; 8],

    /// Package version, assigned by the packer.
    pub version: u32,

    /// Number of metadata records following the header.
    pub resource_count: u32,

    /// Full file size in bytes.
    pub total_size: u64,

    /// Pack time (Unix seconds).
    pub create_time: u64,

    /// CRC32 over all bytes after the header.
    pub checksum: u32,

    /// Reserved, written as zeros.
    pub reserved: [u8; 16],
}

impl PackageHeader {
    /// Create a header with the given version and everything else zeroed.
    pub fn new(version: u32) -> Self {
        PackageHeader {
            magic: MAGIC,
            version,
            resource_count: 0,
            total_size: 0,
            create_time: 0,
            checksum: 0,
            reserved: [0; 16],
        }
    }

    /// Validate the magic bytes and version.
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(PackageError::BadMagic);
        }

        // Version 0 is never written by the packer; anything else is
        // accepted since the field is packer-assigned rather than a format
        // revision.
        if self.version == 0 {
            return Err(PackageError::UnsupportedVersion(self.version));
        }

        Ok(())
    }

    /// Serialize the header to its on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);

        bytes.extend_from_slice(&self.magic);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.resource_count.to_le_bytes());
        bytes.extend_from_slice(&self.total_size.to_le_bytes());
        bytes.extend_from_slice(&self.create_time.to_le_bytes());
        bytes.extend_from_slice(&self.checksum.to_le_bytes());
        bytes.extend_from_slice(&self.reserved);

        bytes
    }

    /// Deserialize and validate a header from its on-disk form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(PackageError::TruncatedPackage(format!(
                "Header requires {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);

        let version = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let resource_count = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
        let total_size = u64::from_le_bytes(bytes[16..24].try_into().unwrap());
        let create_time = u64::from_le_bytes(bytes[24..32].try_into().unwrap());
        let checksum = u32::from_le_bytes(bytes[32..36].try_into().unwrap());

        let mut reserved = [0u8; 16];
        reserved.copy_from_slice(&bytes[36..52]);

        let header = PackageHeader {
            magic,
            version,
            resource_count,
            total_size,
            create_time,
            checksum,
            reserved,
        };

        header.validate()?;

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        let header = PackageHeader::new(1);
        assert_eq!(header.to_bytes().len(), HEADER_SIZE);
    }

    #[test]
    fn test_header_round_trip() {
        let mut header = PackageHeader::new(3);
        header.resource_count = 7;
        header.total_size = 123_456;
        header.create_time = 1_700_000_000;
        header.checksum = 0xDEADBEEF;

        let bytes = header.to_bytes();
        let decoded = PackageHeader::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_little_endian_layout() {
        let mut header = PackageHeader::new(1);
        header.resource_count = 0x0102_0304;

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..8], b"AMBPKG01");
        // resource_count at offset 12, least significant byte first.
        assert_eq!(&bytes[12..16], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_invalid_magic() {
        let mut header = PackageHeader::new(1);
        header.magic = *b"NOTAPKG!";
        assert!(matches!(header.validate(), Err(PackageError::BadMagic)));
    }

    #[test]
    fn test_version_zero_rejected() {
        let header = PackageHeader::new(0);
        assert!(matches!(
            header.validate(),
            Err(PackageError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn test_short_buffer() {
        let header = PackageHeader::new(1);
        let bytes = header.to_bytes();
        assert!(matches!(
            PackageHeader::from_bytes(&bytes[..HEADER_SIZE - 1]),
            Err(PackageError::TruncatedPackage(_))
        ));
    }
}
