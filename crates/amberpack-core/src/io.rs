//! Read-side disk I/O for package files.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{PackageError, Result};
use crate::hash;
use crate::header::{PackageHeader, HEADER_SIZE};
use crate::metadata::{ResourceMetadata, METADATA_SIZE};

const CHECKSUM_CHUNK: usize = 64 * 1024;

/// An opened package file.
///
/// Opening validates the header (magic, version); metadata and payloads are
/// read on demand so mounting never retains payload bytes.
pub struct PackageFile {
    file: File,
    path: PathBuf,
    header: PackageHeader,
}

impl PackageFile {
    /// Open a package and validate its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(&path)?;

        let mut buffer = [0u8; HEADER_SIZE];
        read_exact_or_truncated(&mut file, &mut buffer, "header")?;
        let header = PackageHeader::from_bytes(&buffer)?;

        Ok(PackageFile {
            file,
            path: path.as_ref().to_path_buf(),
            header,
        })
    }

    pub fn header(&self) -> &PackageHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full metadata table and validate every record's payload
    /// range against the file layout.
    pub fn read_metadata_table(&mut self) -> Result<Vec<ResourceMetadata>> {
        let count = self.header.resource_count as usize;
        let table_end = (HEADER_SIZE + count * METADATA_SIZE) as u64;

        self.file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;

        let mut records = Vec::with_capacity(count);
        let mut buffer = vec![0u8; METADATA_SIZE];
        for _ in 0..count {
            read_exact_or_truncated(&mut self.file, &mut buffer, "metadata table")?;
            let meta = ResourceMetadata::from_bytes(&buffer)?;

            if meta.offset < table_end {
                return Err(PackageError::TruncatedPackage(format!(
                    "Payload offset {} for '{}' overlaps the metadata table",
                    meta.offset, meta.name
                )));
            }
            let end = meta.offset.checked_add(meta.size).ok_or_else(|| {
                PackageError::TruncatedPackage(format!(
                    "Payload range overflow for '{}'",
                    meta.name
                ))
            })?;
            if end > self.header.total_size {
                return Err(PackageError::TruncatedPackage(format!(
                    "Payload for '{}' ends at {} past total size {}",
                    meta.name, end, self.header.total_size
                )));
            }

            records.push(meta);
        }

        Ok(records)
    }

    /// Read one resource's stored payload bytes.
    pub fn read_payload(&mut self, meta: &ResourceMetadata) -> Result<Vec<u8>> {
        let end = meta.offset.checked_add(meta.size).unwrap_or(u64::MAX);
        if end > self.header.total_size {
            return Err(PackageError::TruncatedPackage(format!(
                "Payload for '{}' ends at {} past total size {}",
                meta.name, end, self.header.total_size
            )));
        }

        self.file.seek(SeekFrom::Start(meta.offset))?;
        let mut payload = vec![0u8; meta.size as usize];
        read_exact_or_truncated(&mut self.file, &mut payload, "payload")?;
        Ok(payload)
    }

    /// Stream the post-header region through CRC32 and compare against the
    /// header checksum. Also rejects files whose length disagrees with
    /// `total_size`.
    pub fn verify_checksum(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;

        let mut digest = hash::crc32_digest();
        let mut file_len = HEADER_SIZE as u64;
        let mut chunk = vec![0u8; CHECKSUM_CHUNK];
        loop {
            let read = self.file.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            digest.update(&chunk[..read]);
            file_len += read as u64;
        }

        if file_len != self.header.total_size {
            return Err(PackageError::TruncatedPackage(format!(
                "File is {} bytes, header claims {}",
                file_len, self.header.total_size
            )));
        }

        let computed = digest.finalize();
        if computed != self.header.checksum {
            return Err(PackageError::ChecksumMismatch);
        }

        Ok(())
    }
}

fn read_exact_or_truncated(file: &mut File, buffer: &mut [u8], what: &str) -> Result<()> {
    file.read_exact(buffer).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            PackageError::TruncatedPackage(format!("Unexpected end of file reading {}", what))
        } else {
            PackageError::Io(e)
        }
    })
}
