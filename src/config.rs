//! Configuration for PackMap
//!
//! Per-store knobs with sensible defaults. A config is fixed when a store is
//! constructed and shared by every snapshot derived from it.

/// Store configuration
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Parse Configuration
    // -------------------------------------------------------------------------
    /// Defer building the directory until the first access.
    ///
    /// The header length is still validated when the buffer is opened, so
    /// the deferred parse itself cannot fail. Per-record checks move to read
    /// time: out-of-range or short records fail on `get`, hashing and
    /// compaction, and a repeated identifier keeps its last descriptor
    /// instead of being rejected.
    pub lazy_directory: bool,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Recompute the hash of every decoded value and compare it with the
    /// hash stored in front of its record.
    pub verify_hashes: bool,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Upper bound for the content region produced by compaction (in bytes)
    pub max_content_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lazy_directory: false,
            verify_hashes: false,
            max_content_size: u32::MAX,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Defer directory parsing until first access
    pub fn lazy_directory(mut self, lazy: bool) -> Self {
        self.config.lazy_directory = lazy;
        self
    }

    /// Verify stored hashes on decode
    pub fn verify_hashes(mut self, verify: bool) -> Self {
        self.config.verify_hashes = verify;
        self
    }

    /// Set the content region limit (in bytes)
    pub fn max_content_size(mut self, size: u32) -> Self {
        self.config.max_content_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
