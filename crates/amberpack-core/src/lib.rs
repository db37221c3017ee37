//! Amberpack - binary asset packaging and runtime resource management
//!
//! This crate is the runtime asset subsystem of a content pipeline. It has
//! two tightly coupled halves sharing one on-disk format:
//!
//! - [`AssetPacker`] aggregates source files into a single self-describing
//!   `.pkg` container: a fixed header, a metadata table, and a payload
//!   region covered by a CRC32 checksum, with optional per-resource DEFLATE
//!   compression.
//! - [`ResourceManager`] mounts packages (header and metadata only), maps
//!   logical names to stable FNV-1a-32 asset IDs, loads payloads on demand
//!   with reference counting and memory accounting, and supports hot
//!   reload with subscriber notification.
//!
//! ```text
//! source files -> AssetPacker -> .pkg -> ResourceManager::mount
//!                                          -> load("name", type) -> AssetId
//!                                          -> get(id) -> payload bytes
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use amberpack_core::{AssetPacker, ResourceManager, ResourceType, Result};
//!
//! # fn main() -> Result<()> {
//! let mut packer = AssetPacker::new();
//! packer.set_output_path("assets/level1.pkg");
//! packer.set_compression_level(6);
//! packer.add_resource_directory("assets/src", ResourceType::Unknown)?;
//! packer.pack()?;
//!
//! let manager = ResourceManager::new();
//! manager.initialize("assets")?;
//! manager.mount("assets/level1.pkg")?;
//!
//! let id = manager.load("player", ResourceType::Texture2d);
//! if let Some(payload) = manager.get(id) {
//!     // Hand the bytes to a decoder / uploader.
//!     let _ = payload.len();
//! }
//! manager.release(id);
//! # Ok(())
//! # }
//! ```

pub mod codegen;
pub mod compression;
pub mod error;
pub mod hash;
pub mod header;
pub mod io;
pub mod manager;
pub mod metadata;
pub mod packer;

pub use error::{PackageError, Result};
pub use header::{PackageHeader, HEADER_SIZE, MAGIC};
pub use io::PackageFile;
pub use manager::{HotReloadSink, LoadStatus, ResourceManager};
pub use metadata::{
    AssetId, CompressionType, ResourceMetadata, ResourceType, FLAG_COMPRESSED, INVALID_ASSET_ID,
    METADATA_SIZE,
};
pub use packer::AssetPacker;
