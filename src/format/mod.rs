//! Buffer Format
//!
//! Byte layout shared by the directory parser, the content views and the
//! compactor.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header Length: u32 (4) = 24 × record count              │
//! ├─────────────────────────────────────────────────────────┤
//! │ Header (variable)                                       │
//! │   [Identifier: 16][Descriptor: 8]                       │
//! │   ... repeated for each entry, directory order ...      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Content (variable)                                      │
//! │   [Hash: u32 (4)][Payload: size - 4]                    │
//! │   ... records tile the region with no gaps ...          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. A descriptor packs `size:32 | offset:32`,
//! where `size` counts the 4-byte hash and `offset` is relative to the start
//! of the content region.

mod descriptor;
mod hash;
mod record;

pub use descriptor::Descriptor;
pub use hash::{entry_hash, unordered_hash};
pub use record::{read_header_length, HeaderRecord};

// =============================================================================
// Shared Constants
// =============================================================================

/// Size of the leading header length field
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Identifier width inside a header record
pub const IDENTIFIER_SIZE: usize = 16;

/// Descriptor width inside a header record
pub const DESCRIPTOR_SIZE: usize = 8;

/// Header record size: Identifier (16) + Descriptor (8) = 24 bytes
pub const RECORD_SIZE: usize = IDENTIFIER_SIZE + DESCRIPTOR_SIZE;

/// Size of the stored hash in front of every content record
pub const HASH_SIZE: usize = 4;
