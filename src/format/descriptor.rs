//! Descriptor codec
//!
//! Packs a record's `(size, offset)` pair into one 64-bit word.

use std::fmt;

/// Location of a content record, or the pending sentinel
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(u64);

impl Descriptor {
    /// Sentinel for an entry whose value only lives in the decode cache
    pub const PENDING: Descriptor = Descriptor(u64::MAX);

    const OFFSET_MASK: u64 = 0x0000_0000_ffff_ffff;

    /// Pack `size` into the high half and `offset` into the low half
    #[inline]
    pub const fn new(size: u32, offset: u32) -> Self {
        Self(((size as u64) << 32) | offset as u64)
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Record length, including the stored hash
    #[inline]
    pub const fn size(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Record position within the content region
    #[inline]
    pub const fn offset(self) -> u32 {
        (self.0 & Self::OFFSET_MASK) as u32
    }

    /// Same size, new position
    #[inline]
    pub const fn rebase(self, offset: u32) -> Self {
        Self((self.0 & !Self::OFFSET_MASK) | offset as u64)
    }

    #[inline]
    pub const fn is_pending(self) -> bool {
        self.0 == Self::PENDING.0
    }

    /// Byte range of the record inside the content region
    #[inline]
    pub fn range(self) -> std::ops::Range<usize> {
        let start = self.offset() as usize;
        start..start + self.size() as usize
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pending() {
            f.write_str("Descriptor(pending)")
        } else {
            f.debug_struct("Descriptor")
                .field("size", &self.size())
                .field("offset", &self.offset())
                .finish()
        }
    }
}
