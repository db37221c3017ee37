//! Payload compression and decompression dispatch.
//!
//! DEFLATE (zlib streams) is the reference codec. LZ4, ZSTD, BC7 and ASTC
//! are recognized wire values whose dispatch arms fail with
//! `UnsupportedCodec`; texture codecs would additionally need per-texture
//! layout information that the core does not interpret.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{PackageError, Result};
use crate::metadata::CompressionType;

/// Compress payload bytes with the given codec.
///
/// `level` is only meaningful for DEFLATE (1-9).
pub fn compress(data: &[u8], codec: CompressionType, level: u32) -> Result<Vec<u8>> {
    match codec {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionType::Lz4
        | CompressionType::Zstd
        | CompressionType::Bc7
        | CompressionType::Astc => Err(PackageError::UnsupportedCodec(codec)),
    }
}

/// Decompress stored payload bytes into exactly `original_size` bytes.
///
/// For DEFLATE the stream must terminate cleanly and inflate to exactly the
/// recorded size; anything else is a `DecompressError`.
pub fn decompress(data: &[u8], codec: CompressionType, original_size: usize) -> Result<Vec<u8>> {
    match codec {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Deflate => {
            let mut decoder = ZlibDecoder::new(data);
            let mut out = Vec::with_capacity(original_size);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| PackageError::DecompressError(e.to_string()))?;
            if out.len() != original_size {
                return Err(PackageError::DecompressError(format!(
                    "Inflated to {} bytes, expected {}",
                    out.len(),
                    original_size
                )));
            }
            Ok(out)
        }
        CompressionType::Lz4
        | CompressionType::Zstd
        | CompressionType::Bc7
        | CompressionType::Astc => Err(PackageError::UnsupportedCodec(codec)),
    }
}

/// Compress with DEFLATE if that actually shrinks the payload, returning
/// the bytes to store and the codec recorded in metadata. Level 0 disables
/// compression entirely.
pub fn compress_if_smaller(data: &[u8], level: u32) -> Result<(Vec<u8>, CompressionType)> {
    if level == 0 {
        return Ok((data.to_vec(), CompressionType::None));
    }

    let compressed = compress(data, CompressionType::Deflate, level)?;
    if compressed.len() >= data.len() {
        // Not worth it, store uncompressed.
        Ok((data.to_vec(), CompressionType::None))
    } else {
        Ok((compressed, CompressionType::Deflate))
    }
}
