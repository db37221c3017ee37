//! Checksums and content hashes for the package format.
//!
//! The file checksum is CRC32 (polynomial `0xEDB88320`, initial register
//! `0xFFFFFFFF`, final complement) over every byte after the header region.
//! Asset IDs are FNV-1a-32 of a resource's logical name; content hashes are
//! FNV-1a-64 of the stored payload bytes. Neither FNV hash is
//! collision-resistant and they carry no security guarantees.

use crc::{Crc, Digest, CRC_32_ISO_HDLC};

// CRC_32_ISO_HDLC is the reflected 0xEDB88320 variant with init/xorout
// 0xFFFFFFFF, matching the on-disk checksum definition exactly.
static CRC32_ALGO: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const FNV_OFFSET_32: u32 = 2_166_136_261;
const FNV_PRIME_32: u32 = 16_777_619;

const FNV_OFFSET_64: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME_64: u64 = 1_099_511_628_211;

/// Compute the package checksum over a contiguous byte run.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32_ALGO.checksum(data)
}

/// Start a streaming checksum computation for chunked reads.
pub fn crc32_digest() -> Digest<'static, u32> {
    CRC32_ALGO.digest()
}

/// FNV-1a-32 over raw bytes. Used for asset IDs; 0 is reserved as the
/// invalid ID but is as likely as any other output, so callers treat a zero
/// result as a lookup failure rather than an error.
pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_32;
    for &byte in data {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME_32);
    }
    hash
}

/// FNV-1a-64 over raw bytes.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_64;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME_64);
    }
    hash
}

/// Render the content hash of stored payload bytes into the fixed 32-byte
/// metadata field: 16 lowercase hex digits, NUL-terminated, zero-padded.
pub fn content_hash(data: &[u8]) -> [u8; 32] {
    let hex = format!("{:016x}", fnv1a_64(data));
    let mut field = [0u8; 32];
    field[..16].copy_from_slice(hex.as_bytes());
    field
}
