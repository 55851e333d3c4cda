//! # PackMap
//!
//! A compact, UUID-keyed binary map that serializes into one contiguous
//! buffer and rehydrates lazily:
//! - Values are decoded only when requested, and at most once per snapshot
//! - `set`/`remove` derive new snapshots over persistent maps
//! - Compaction copies untouched records verbatim and encodes only pending ones
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        PackMap                               │
//! │          get / set / remove / iter / to_bytes                │
//! └──────────┬──────────────────┬──────────────────┬────────────┘
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!   ┌─────────────┐      ┌─────────────┐    ┌─────────────┐
//!   │ DecodeCache │      │  Directory  │    │  Compactor  │
//!   │ (id → value)│      │(id → desc.) │    │ (rewrite)   │
//!   └─────────────┘      └──────┬──────┘    └──────┬──────┘
//!                               │                  │
//!                               ▼                  ▼
//!                        ┌─────────────────────────────┐
//!                        │   Content  [hash][payload]  │
//!                        └─────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use packmap::{PackMap, Utf8Codec};
//! use uuid::Uuid;
//!
//! # fn main() -> packmap::Result<()> {
//! let id = Uuid::new_v4();
//! let map = PackMap::new(Utf8Codec).set(id, "hello".to_string());
//! let bytes = map.to_bytes()?;
//!
//! let reopened = PackMap::from_bytes(bytes, Utf8Codec)?;
//! assert_eq!(reopened.get(&id)?.as_deref().map(String::as_str), Some("hello"));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod codec;

pub mod format;
pub mod directory;
pub mod content;
pub mod cache;
pub mod map;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PackError, Result};
pub use config::Config;
pub use codec::{BincodeCodec, CodecError, RawCodec, Utf8Codec, ValueCodec};
pub use format::Descriptor;
pub use map::{Iter, LazyEntry, MapStats, PackMap};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PackMap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
