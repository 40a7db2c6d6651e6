use std::fmt;
use std::ptr;
use std::slice;

use crate::page::layout::page_capacity;

/// Base pointers of the regions for one raw write session.
///
/// The region never owns memory. Whoever builds it keeps the memory alive and
/// unaliased until the batch written into it has been delivered.
pub struct RawOutputRegion {
    base: u64,
    contents: *mut u8,
    capacity: usize,
    writable: usize,
    offsets: *mut u64,
    offset_slots: usize,
    key_lengths: *mut u64,
    key_slots: usize,
}

impl RawOutputRegion {
    /// Describes transport-owned output memory.
    ///
    /// `capacity` drives the flush policy and the overflow check at page
    /// close. `writable` is the size of the allocation behind `contents`; a
    /// field that would run past it fails before any byte is stored.
    /// `key_lengths` is null on unkeyed edges, in which case `key_slots` is
    /// ignored.
    ///
    /// # Safety
    ///
    /// Until the session is delivered or the writer is reset:
    /// - `contents` must be valid for writes of `writable` bytes.
    /// - `offsets` must be valid for writes of `offset_slots` values.
    /// - a non-null `key_lengths` must be valid for writes of `key_slots` values.
    /// - none of the three may overlap or be accessed through other pointers.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn from_raw_parts(
        base: u64,
        contents: *mut u8,
        capacity: usize,
        writable: usize,
        offsets: *mut u64,
        offset_slots: usize,
        key_lengths: *mut u64,
        key_slots: usize,
    ) -> Self {
        Self {
            base,
            contents,
            capacity,
            writable,
            offsets,
            offset_slots,
            key_lengths,
            key_slots: if key_lengths.is_null() { 0 } else { key_slots },
        }
    }

    /// Base added to content positions to form table offsets.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Declared content capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes of backing memory behind the content pointer.
    pub fn writable(&self) -> usize {
        self.writable
    }

    /// Returns whether pages carry a key prefix.
    pub fn has_key(&self) -> bool {
        !self.key_lengths.is_null()
    }

    /// Maximum number of pages the tables can describe.
    pub fn max_pages(&self) -> usize {
        page_capacity(self.offset_slots, self.has_key().then_some(self.key_slots))
    }

    #[inline]
    pub(crate) fn contents_ptr(&self) -> *mut u8 {
        self.contents
    }

    #[inline]
    pub(crate) fn offsets_ptr(&self) -> *mut u64 {
        self.offsets
    }

    #[inline]
    pub(crate) fn key_lengths_ptr(&self) -> *mut u64 {
        self.key_lengths
    }
}

impl fmt::Debug for RawOutputRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOutputRegion")
            .field("base", &format_args!("{:#x}", self.base))
            .field("capacity", &self.capacity)
            .field("writable", &self.writable)
            .field("max_pages", &self.max_pages())
            .field("keyed", &self.has_key())
            .finish()
    }
}

/// A flushed raw session, borrowed for the duration of a sink hand-off.
pub struct RawBatch<'a> {
    region: &'a RawOutputRegion,
    content_len: usize,
    page_count: usize,
}

impl<'a> RawBatch<'a> {
    pub(crate) fn new(region: &'a RawOutputRegion, content_len: usize, page_count: usize) -> Self {
        Self {
            region,
            content_len,
            page_count,
        }
    }

    /// Base of the offset table.
    pub fn base(&self) -> u64 {
        self.region.base
    }

    /// Number of closed pages.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Bytes written in the session.
    pub fn contents(&self) -> &'a [u8] {
        if self.content_len == 0 {
            return &[];
        }
        // The writer only produces batches for regions it wrote
        // `content_len` bytes into under the `from_raw_parts` contract.
        unsafe { slice::from_raw_parts(self.region.contents, self.content_len) }
    }

    /// Offset table: `page_count + 1` entries, or none when empty.
    pub fn offsets(&self) -> &'a [u64] {
        if self.page_count == 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.region.offsets, self.page_count + 1) }
    }

    /// Key-length table; empty on unkeyed edges.
    pub fn key_lengths(&self) -> &'a [u64] {
        if self.page_count == 0 || !self.region.has_key() {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.region.key_lengths, self.page_count) }
    }
}

impl fmt::Debug for RawBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBatch")
            .field("base", &format_args!("{:#x}", self.base()))
            .field("pages", &self.page_count)
            .field("contents", &self.content_len)
            .finish()
    }
}

/// Base pointers of resident pages for a raw reader.
pub struct RawInputRegion {
    base: u64,
    contents: *const u8,
    offsets: *const u64,
    offset_count: usize,
}

impl RawInputRegion {
    /// Describes transport-owned input memory.
    ///
    /// # Safety
    ///
    /// Until the reader moves past this region or is reset:
    /// - `offsets` must be valid for reads of `offset_count` values that do
    ///   not decrease and are not below `base`.
    /// - for every entry, `contents + (offset - base)` must stay inside one
    ///   allocation that is valid for reads up to the last entry.
    /// - the memory must not be written through other pointers.
    pub unsafe fn from_raw_parts(
        base: u64,
        contents: *const u8,
        offsets: *const u64,
        offset_count: usize,
    ) -> Self {
        Self {
            base,
            contents,
            offsets,
            offset_count,
        }
    }

    /// Region with no pages.
    pub fn empty() -> Self {
        Self {
            base: 0,
            contents: ptr::null(),
            offsets: ptr::null(),
            offset_count: 0,
        }
    }

    /// Base subtracted from table offsets.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Number of pages described by the table.
    pub fn page_count(&self) -> usize {
        self.offset_count.saturating_sub(1)
    }

    #[inline]
    pub(crate) fn contents_ptr(&self) -> *const u8 {
        self.contents
    }

    #[inline]
    pub(crate) fn offset(&self, index: usize) -> u64 {
        debug_assert!(index < self.offset_count);
        unsafe { *self.offsets.add(index) }
    }

    #[inline]
    pub(crate) fn offset_count(&self) -> usize {
        self.offset_count
    }
}

impl fmt::Debug for RawInputRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawInputRegion")
            .field("base", &format_args!("{:#x}", self.base))
            .field("pages", &self.page_count())
            .finish()
    }
}
