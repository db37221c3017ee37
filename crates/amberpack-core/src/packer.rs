//! One-shot package build pipeline.
//!
//! Inputs are enumerated, classified, read and optionally compressed up
//! front; `pack()` then lays the file out in a single pass, patches the
//! payload offsets back into the metadata table, and finalizes the header
//! checksum. The file is assembled under a temporary name and renamed into
//! place so a failed pack never leaves a truncated package behind.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::compression;
use crate::error::{PackageError, Result};
use crate::hash;
use crate::header::{PackageHeader, HEADER_SIZE};
use crate::metadata::{
    AssetId, CompressionType, ResourceMetadata, ResourceType, FLAG_COMPRESSED, NAME_FIELD_LEN,
};

const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Builds a package file from a set of input files.
///
/// Single-threaded, one-shot: configure, add inputs, call [`pack`].
///
/// [`pack`]: AssetPacker::pack
pub struct AssetPacker {
    output_path: Option<PathBuf>,
    version: u32,
    compression_level: u32,
    overwrite: bool,

    metadata: Vec<ResourceMetadata>,
    payloads: Vec<Vec<u8>>,
    processed_files: Vec<PathBuf>,
    name_to_id: HashMap<String, AssetId>,
    total_size: u64,
}

impl AssetPacker {
    pub fn new() -> Self {
        AssetPacker {
            output_path: None,
            version: 1,
            compression_level: 0,
            overwrite: false,
            metadata: Vec::new(),
            payloads: Vec::new(),
            processed_files: Vec::new(),
            name_to_id: HashMap::new(),
            total_size: 0,
        }
    }

    /// Set the destination `.pkg` path. Required before [`pack`].
    ///
    /// [`pack`]: AssetPacker::pack
    pub fn set_output_path<P: AsRef<Path>>(&mut self, path: P) {
        self.output_path = Some(path.as_ref().to_path_buf());
    }

    /// Set the package version written to the header.
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Set the DEFLATE level, clamped to 0-9. 0 disables compression.
    pub fn set_compression_level(&mut self, level: u32) {
        self.compression_level = level.min(MAX_COMPRESSION_LEVEL);
    }

    /// Allow replacing an existing file at the output path.
    pub fn set_overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    /// Add one regular file as a resource.
    ///
    /// Pass [`ResourceType::Unknown`] to infer the type from the file
    /// extension; unrecognized extensions reject the file.
    pub fn add_resource<P: AsRef<Path>>(
        &mut self,
        path: P,
        resource_type: ResourceType,
    ) -> Result<()> {
        let path = path.as_ref();

        let file_meta = fs::metadata(path)?;
        if !file_meta.is_file() {
            return Err(PackageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            )));
        }

        if self.processed_files.iter().any(|p| p == path) {
            return Err(PackageError::Duplicate(path.display().to_string()));
        }

        self.process_resource(path, resource_type)
    }

    /// Recursively add every regular file beneath `dir`.
    ///
    /// The first per-file failure (duplicate name, undetectable type, I/O
    /// error) aborts the walk and is returned.
    pub fn add_resource_directory<P: AsRef<Path>>(
        &mut self,
        dir: P,
        resource_type: ResourceType,
    ) -> Result<()> {
        let dir = dir.as_ref();

        let dir_meta = fs::metadata(dir)?;
        if !dir_meta.is_dir() {
            return Err(PackageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a directory: {}", dir.display()),
            )));
        }

        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                self.add_resource(entry.path(), resource_type)?;
            }
        }

        Ok(())
    }

    /// Number of resources added so far.
    pub fn resource_count(&self) -> usize {
        self.metadata.len()
    }

    /// Total output file size, available after a successful [`pack`].
    ///
    /// [`pack`]: AssetPacker::pack
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Source paths accepted so far, in insertion order.
    pub fn processed_files(&self) -> &[PathBuf] {
        &self.processed_files
    }

    /// Write the package file.
    pub fn pack(&mut self) -> Result<()> {
        if self.metadata.is_empty() {
            return Err(PackageError::NoResources);
        }

        let output_path = self.output_path.clone().ok_or_else(|| {
            PackageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Output path not set",
            ))
        })?;

        if output_path.exists() && !self.overwrite {
            return Err(PackageError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Output file already exists: {}", output_path.display()),
            )));
        }

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        info!(
            "Packing {} resources into {}",
            self.metadata.len(),
            output_path.display()
        );

        // Assemble under a temporary name, rename into place on success.
        let mut tmp_os = output_path.as_os_str().to_os_string();
        tmp_os.push(".tmp");
        let tmp_path = PathBuf::from(tmp_os);

        match self.write_package(&tmp_path) {
            Ok(total_size) => {
                fs::rename(&tmp_path, &output_path)?;
                self.total_size = total_size;
                info!(
                    "Wrote package {} ({} bytes, {} resources)",
                    output_path.display(),
                    total_size,
                    self.metadata.len()
                );
                Ok(())
            }
            Err(e) => {
                fs::remove_file(&tmp_path).ok();
                Err(e)
            }
        }
    }

    fn process_resource(&mut self, path: &Path, resource_type: ResourceType) -> Result<()> {
        let actual_type = if resource_type == ResourceType::Unknown {
            let detected = path
                .extension()
                .and_then(|e| e.to_str())
                .map(ResourceType::from_extension)
                .unwrap_or(ResourceType::Unknown);
            if detected == ResourceType::Unknown {
                return Err(PackageError::UnknownType(path.display().to_string()));
            }
            detected
        } else {
            resource_type
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                PackageError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Cannot derive a resource name from {}", path.display()),
                ))
            })?;

        if name.len() >= NAME_FIELD_LEN {
            return Err(PackageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Resource name exceeds {} bytes: {}", NAME_FIELD_LEN - 1, name),
            )));
        }

        if self.name_to_id.contains_key(&name) {
            return Err(PackageError::Duplicate(name));
        }

        let data = fs::read(path)?;
        let original_size = data.len() as u64;

        let (stored, codec) = compression::compress_if_smaller(&data, self.compression_level)?;
        let mut flags = 0;
        if codec != CompressionType::None {
            flags |= FLAG_COMPRESSED;
            let saved = 100.0 * (1.0 - stored.len() as f64 / data.len().max(1) as f64);
            info!(
                "Compressed {}: {} -> {} bytes ({:.1}% saved)",
                path.display(),
                data.len(),
                stored.len(),
                saved
            );
        }

        let id = hash::fnv1a_32(name.as_bytes());
        let meta = ResourceMetadata {
            id,
            resource_type: actual_type,
            offset: 0, // patched during pack()
            size: stored.len() as u64,
            name: name.clone(),
            flags,
            compression: codec,
            original_size,
            hash: hash::content_hash(&stored),
        };

        debug!(
            "Added resource '{}' ({:?}, id {:#010x}) from {}",
            name,
            actual_type,
            id,
            path.display()
        );

        self.name_to_id.insert(name, id);
        self.metadata.push(meta);
        self.payloads.push(stored);
        self.processed_files.push(path.to_path_buf());

        Ok(())
    }

    /// Run the ordered write pipeline against `path`, returning the final
    /// file size.
    fn write_package(&mut self, path: &Path) -> Result<u64> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        // 1. Header with placeholder total_size and checksum.
        let mut header = PackageHeader::new(self.version);
        header.resource_count = self.metadata.len() as u32;
        header.create_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        file.write_all(&header.to_bytes())?;

        // 2. Metadata table with placeholder offsets.
        for meta in &self.metadata {
            file.write_all(&meta.to_bytes())?;
        }

        // 3. Payloads in insertion order, recording each offset.
        for (meta, payload) in self.metadata.iter_mut().zip(&self.payloads) {
            meta.offset = file.stream_position()?;
            file.write_all(payload)?;
        }

        // 4. Final file size.
        let total_size = file.stream_position()?;

        // 5. Rewrite the metadata table with real offsets.
        file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        for meta in &self.metadata {
            file.write_all(&meta.to_bytes())?;
        }

        // 6. Checksum the post-header region and finalize the header.
        file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        let mut digest = hash::crc32_digest();
        let mut chunk = vec![0u8; 64 * 1024];
        loop {
            let read = file.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            digest.update(&chunk[..read]);
        }

        header.total_size = total_size;
        header.checksum = digest.finalize();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.to_bytes())?;
        file.sync_all()?;

        Ok(total_size)
    }
}

impl Default for AssetPacker {
    fn default() -> Self {
        Self::new()
    }
}
