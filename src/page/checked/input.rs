use core::cmp::Ordering;
use std::sync::Arc;

use bytes::Bytes;

use super::fragment::InputFragment;
use crate::page::layout::to_position;
use crate::page::PageInput;
use crate::primitives::bytes::cmp::compare_regions;
use crate::types::{BridgeError, Result};

/// Supplies further fragments once a reader exhausts its current one.
pub trait FragmentSource {
    /// Returns the next fragment, or `None` at end of stream.
    fn next_fragment(&mut self) -> Option<InputFragment>;
}

impl<I> FragmentSource for I
where
    I: Iterator<Item = InputFragment>,
{
    fn next_fragment(&mut self) -> Option<InputFragment> {
        self.next()
    }
}

/// Bounds-checked page cursor.
///
/// Every read is checked against the current page end and fails with
/// [`BridgeError::PageBounds`] instead of reading into the next page.
pub struct CheckedPageReader<S> {
    source: S,
    base: u64,
    contents: Bytes,
    offsets: Arc<[u64]>,
    next_entry: usize,
    page_start: usize,
    position: usize,
    limit: usize,
}

impl<S: FragmentSource> CheckedPageReader<S> {
    /// Creates a reader with no resident pages; the first
    /// [`next_page`](PageInput::next_page) pulls from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            base: 0,
            contents: Bytes::new(),
            offsets: Arc::from(&[][..]),
            next_entry: 0,
            page_start: 0,
            position: 0,
            limit: 0,
        }
    }

    /// Replaces the resident pages with `fragment`.
    ///
    /// The cursor is left before the first page.
    pub fn reset(&mut self, fragment: InputFragment) {
        let (base, contents, offsets) = fragment.into_parts();
        let first = match offsets.first() {
            Some(&offset) if offsets.len() > 1 => to_position(offset, base),
            _ => 0,
        };
        self.next_entry = if offsets.len() > 1 { 1 } else { offsets.len() };
        self.base = base;
        self.contents = contents;
        self.offsets = offsets;
        self.page_start = first;
        self.position = first;
        self.limit = first;
    }

    /// Returns the fragment source.
    pub fn source(&self) -> &S {
        &self.source
    }

    fn advance_on_table(&mut self) -> bool {
        if self.next_entry >= self.offsets.len() {
            return false;
        }
        let end = to_position(self.offsets[self.next_entry], self.base);
        self.next_entry += 1;
        self.page_start = self.limit;
        self.position = self.limit;
        self.limit = end;
        true
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let remaining = self.limit - self.position;
        if n > remaining {
            return Err(BridgeError::PageBounds {
                requested: n,
                remaining,
            });
        }
        let start = self.position;
        self.position += n;
        Ok(&self.contents[start..start + n])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn unread(&self) -> &[u8] {
        &self.contents[self.position..self.limit]
    }
}

impl<S: FragmentSource> PageInput for CheckedPageReader<S> {
    fn next_page(&mut self) -> bool {
        loop {
            if self.advance_on_table() {
                return true;
            }
            match self.source.next_fragment() {
                Some(fragment) => self.reset(fragment),
                None => return false,
            }
        }
    }

    fn remaining(&self) -> usize {
        self.limit - self.position
    }

    fn rewind(&mut self) {
        self.position = self.page_start;
    }

    fn compare_page(&self, other: &Self) -> Ordering {
        compare_regions(self.unread(), other.unread())
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        let len = dst.len();
        dst.copy_from_slice(self.take(len)?);
        Ok(())
    }

    fn skip_bytes(&mut self, n: usize) -> usize {
        let skipped = n.min(self.remaining());
        self.position += skipped;
        skipped
    }
}
