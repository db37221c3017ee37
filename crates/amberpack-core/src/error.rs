use crate::metadata::{CompressionType, ResourceType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Resource manager not initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes in package header")]
    BadMagic,

    #[error("Unsupported package version: {0}")]
    UnsupportedVersion(u32),

    #[error("Package checksum verification failed")]
    ChecksumMismatch,

    #[error("Truncated package: {0}")]
    TruncatedPackage(String),

    #[error("Resource not found: {0}")]
    NameNotFound(String),

    #[error("Resource type mismatch for {name}: stored {stored:?}, requested {requested:?}")]
    TypeMismatch {
        name: String,
        stored: ResourceType,
        requested: ResourceType,
    },

    #[error("Duplicate resource: {0}")]
    Duplicate(String),

    #[error("Cannot detect resource type: {0}")]
    UnknownType(String),

    #[error("Unsupported compression codec: {0:?}")]
    UnsupportedCodec(CompressionType),

    #[error("Unknown compression codec value: {0}")]
    UnknownCodec(u32),

    #[error("Decompression failed: {0}")]
    DecompressError(String),

    #[error("No resources to pack")]
    NoResources,
}

pub type Result<T> = std::result::Result<T, PackageError>;
