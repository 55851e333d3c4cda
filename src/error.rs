//! Error types for PackMap
//!
//! Provides a unified error type for all operations.

use thiserror::Error;
use uuid::Uuid;

use crate::codec::CodecError;

/// Result type alias using PackError
pub type Result<T> = std::result::Result<T, PackError>;

/// Unified error type for PackMap operations
#[derive(Debug, Error)]
pub enum PackError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Layout Errors
    // -------------------------------------------------------------------------
    #[error("Malformed buffer: {0}")]
    MalformedBuffer(String),

    #[error("Record out of bounds: offset={offset} size={size} content_len={len}")]
    OutOfBounds { offset: u32, size: u32, len: usize },

    #[error("{what} too large: {len} bytes")]
    CapacityExceeded { what: &'static str, len: usize },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Failed to encode value for {id}: {source}")]
    Encode {
        id: Uuid,
        #[source]
        source: CodecError,
    },

    #[error("Failed to decode value for {id}: {source}")]
    Decode {
        id: Uuid,
        #[source]
        source: CodecError,
    },

    // -------------------------------------------------------------------------
    // API Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}
