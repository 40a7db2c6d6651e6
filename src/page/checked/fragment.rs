use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::page::layout::{page_capacity, to_position};
use crate::types::{BridgeError, Result};

/// Output regions for one write session, and the frozen batch they become
/// once the session is flushed.
///
/// The writer only writes inside the buffers handed to it; allocating them is
/// up to the transport.
pub struct OutputFragment {
    base: u64,
    contents: Box<[u8]>,
    offsets: Box<[u64]>,
    key_lengths: Option<Box<[u64]>>,
    content_len: usize,
    page_count: usize,
}

impl OutputFragment {
    /// Wraps transport-owned buffers.
    pub fn new(
        base: u64,
        contents: Box<[u8]>,
        offsets: Box<[u64]>,
        key_lengths: Option<Box<[u64]>>,
    ) -> Self {
        Self {
            base,
            contents,
            offsets,
            key_lengths,
            content_len: 0,
            page_count: 0,
        }
    }

    /// Allocates zeroed buffers for `capacity` content bytes and `max_pages` pages.
    pub fn allocate(capacity: usize, max_pages: usize, keyed: bool) -> Self {
        Self::new(
            0,
            vec![0u8; capacity].into_boxed_slice(),
            vec![0u64; max_pages + 1].into_boxed_slice(),
            keyed.then(|| vec![0u64; max_pages].into_boxed_slice()),
        )
    }

    /// Base added to content positions to form table offsets.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Declared capacity of the content region.
    pub fn capacity(&self) -> usize {
        self.contents.len()
    }

    /// Maximum number of pages the tables can describe.
    pub fn max_pages(&self) -> usize {
        page_capacity(
            self.offsets.len(),
            self.key_lengths.as_ref().map(|keys| keys.len()),
        )
    }

    /// Returns whether pages carry a key prefix.
    pub fn has_key(&self) -> bool {
        self.key_lengths.is_some()
    }

    /// Number of pages in the flushed batch.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Written content bytes.
    pub fn contents(&self) -> &[u8] {
        &self.contents[..self.content_len]
    }

    /// Offset table of the batch: `page_count + 1` entries, or none when empty.
    pub fn offsets(&self) -> &[u64] {
        if self.page_count == 0 {
            &[]
        } else {
            &self.offsets[..=self.page_count]
        }
    }

    /// Key-length table of the batch; empty on unkeyed edges.
    pub fn key_lengths(&self) -> &[u64] {
        match &self.key_lengths {
            Some(keys) => &keys[..self.page_count],
            None => &[],
        }
    }

    /// Bytes of page `index`, or `None` past the last page.
    pub fn page(&self, index: usize) -> Option<&[u8]> {
        let (start, end) = self.page_range(index)?;
        Some(&self.contents[start..end])
    }

    /// Key prefix of page `index`. `None` on unkeyed batches or past the last
    /// page.
    pub fn key(&self, index: usize) -> Option<&[u8]> {
        let keys = self.key_lengths.as_ref()?;
        let (start, _) = self.page_range(index)?;
        Some(&self.contents[start..start + keys[index] as usize])
    }

    /// Value part of page `index`: the page without its key prefix.
    pub fn value(&self, index: usize) -> Option<&[u8]> {
        let (mut start, end) = self.page_range(index)?;
        if let Some(keys) = &self.key_lengths {
            start += keys[index] as usize;
        }
        Some(&self.contents[start..end])
    }

    fn page_range(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.page_count {
            return None;
        }
        Some((
            to_position(self.offsets[index], self.base),
            to_position(self.offsets[index + 1], self.base),
        ))
    }

    /// Converts the flushed batch into a read-only fragment.
    ///
    /// Key prefixes stay inside the pages; readers of keyed batches are fed
    /// by the scatter-gather exchange instead.
    pub fn into_input(self) -> InputFragment {
        let offsets: Arc<[u64]> = Arc::from(self.offsets());
        let mut contents = Vec::from(self.contents);
        contents.truncate(self.content_len);
        InputFragment {
            base: self.base,
            contents: Bytes::from(contents),
            offsets,
        }
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [u8], &mut [u64], Option<&mut [u64]>) {
        (
            &mut self.contents,
            &mut self.offsets,
            self.key_lengths.as_deref_mut(),
        )
    }

    pub(crate) fn seal(&mut self, content_len: usize, page_count: usize) {
        self.content_len = content_len;
        self.page_count = page_count;
    }
}

impl fmt::Debug for OutputFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputFragment")
            .field("base", &self.base)
            .field("capacity", &self.capacity())
            .field("pages", &self.page_count)
            .field("contents", &self.content_len)
            .field("keyed", &self.has_key())
            .finish()
    }
}

/// Read-only pages delivered to a downstream task.
#[derive(Clone)]
pub struct InputFragment {
    base: u64,
    contents: Bytes,
    offsets: Arc<[u64]>,
}

impl InputFragment {
    /// Validates and wraps a content region and its offset table.
    ///
    /// Offsets must be non-decreasing and stay inside `contents` once `base`
    /// is subtracted.
    pub fn new(base: u64, contents: Bytes, offsets: impl Into<Arc<[u64]>>) -> Result<Self> {
        let offsets = offsets.into();
        let mut last = None;
        for &offset in offsets.iter() {
            if offset < base {
                return Err(BridgeError::Invalid("page offset below base"));
            }
            let position = to_position(offset, base);
            if position > contents.len() {
                return Err(BridgeError::Invalid("page offset past content end"));
            }
            if last.is_some_and(|prev| position < prev) {
                return Err(BridgeError::Invalid("page offsets must not decrease"));
            }
            last = Some(position);
        }
        Ok(Self {
            base,
            contents,
            offsets,
        })
    }

    /// Empty fragment with no pages.
    pub fn empty() -> Self {
        Self {
            base: 0,
            contents: Bytes::new(),
            offsets: Arc::from(&[][..]),
        }
    }

    /// Base subtracted from table offsets.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Content bytes.
    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    /// Offset table (`page_count + 1` entries).
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Number of pages described by the table.
    pub fn page_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Bytes of page `index`, or `None` past the last page.
    pub fn page(&self, index: usize) -> Option<&[u8]> {
        let bounds = self.offsets.get(index..index.checked_add(2)?)?;
        let start = to_position(bounds[0], self.base);
        let end = to_position(bounds[1], self.base);
        Some(&self.contents[start..end])
    }

    pub(crate) fn into_parts(self) -> (u64, Bytes, Arc<[u64]>) {
        (self.base, self.contents, self.offsets)
    }
}

impl fmt::Debug for InputFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFragment")
            .field("base", &self.base)
            .field("pages", &self.page_count())
            .field("contents", &self.contents.len())
            .finish()
    }
}
