//! Content Module
//!
//! The byte region holding `[hash:4][payload]` records addressed by
//! descriptors.
//!
//! ## Responsibilities
//! - Bounds-checked reads of committed records (`ContentView`)
//! - Sequential construction of a fresh region during compaction
//!   (`ContentWriter`), checked against the precomputed size

mod reader;
mod writer;

pub use reader::ContentView;
pub use writer::ContentWriter;
