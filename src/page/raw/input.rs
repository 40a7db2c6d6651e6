use core::cmp::Ordering;
use std::ptr;

use super::region::RawInputRegion;
use crate::page::layout::to_position;
use crate::page::PageInput;
use crate::primitives::bytes::cmp::compare_word;
use crate::types::{BridgeError, Result};

/// Supplies further raw regions once a reader exhausts its current one.
pub trait RawRegionSource {
    /// Returns the next region, or `None` at end of stream.
    ///
    /// Memory behind the previously returned region may be released once this
    /// is called again.
    fn next_region(&mut self) -> Option<RawInputRegion>;
}

/// Page cursor over raw base pointers.
///
/// Field loads are unaligned pointer reads. A read that would cross the
/// current page end fails with [`BridgeError::PageBounds`], as it does on the
/// checked backend.
pub struct RawPageReader<S> {
    source: S,
    region: RawInputRegion,
    next_entry: usize,
    page_start: usize,
    position: usize,
    limit: usize,
}

// SAFETY: the region contract forbids other writers to the resident pages.
unsafe impl<S: Send> Send for RawPageReader<S> {}

impl<S: RawRegionSource> RawPageReader<S> {
    /// Creates a reader with no resident pages.
    pub fn new(source: S) -> Self {
        Self {
            source,
            region: RawInputRegion::empty(),
            next_entry: 0,
            page_start: 0,
            position: 0,
            limit: 0,
        }
    }

    /// Replaces the resident pages with `region`.
    pub fn reset(&mut self, region: RawInputRegion) {
        let count = region.offset_count();
        let first = if count > 1 {
            to_position(region.offset(0), region.base())
        } else {
            0
        };
        self.next_entry = if count > 1 { 1 } else { count };
        self.region = region;
        self.page_start = first;
        self.position = first;
        self.limit = first;
    }

    /// Returns the region source.
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    fn cursor(&self) -> *const u8 {
        unsafe { self.region.contents_ptr().add(self.position) }
    }

    #[inline]
    fn advance(&mut self, n: usize) -> Result<*const u8> {
        let remaining = self.limit - self.position;
        if n > remaining {
            return Err(BridgeError::PageBounds {
                requested: n,
                remaining,
            });
        }
        let at = self.cursor();
        self.position += n;
        Ok(at)
    }
}

impl<S: RawRegionSource> PageInput for RawPageReader<S> {
    fn next_page(&mut self) -> bool {
        loop {
            if self.next_entry < self.region.offset_count() {
                let end = to_position(self.region.offset(self.next_entry), self.region.base());
                self.next_entry += 1;
                self.page_start = self.limit;
                self.position = self.limit;
                self.limit = end;
                return true;
            }
            match self.source.next_region() {
                Some(region) => self.reset(region),
                None => return false,
            }
        }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.limit - self.position
    }

    fn rewind(&mut self) {
        self.position = self.page_start;
    }

    fn compare_page(&self, other: &Self) -> Ordering {
        let len_a = self.remaining();
        let len_b = other.remaining();
        let prefix = len_a.min(len_b);
        let a = self.cursor();
        let b = other.cursor();
        let mut i = 0;
        unsafe {
            while i + 8 <= prefix {
                let x = u64::from_be(a.add(i).cast::<u64>().read_unaligned());
                let y = u64::from_be(b.add(i).cast::<u64>().read_unaligned());
                if x != y {
                    return compare_word(x, y);
                }
                i += 8;
            }
            while i < prefix {
                let x = *a.add(i);
                let y = *b.add(i);
                if x != y {
                    return x.cmp(&y);
                }
                i += 1;
            }
        }
        len_a.cmp(&len_b)
    }

    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        let at = self.advance(1)?;
        Ok(unsafe { *at })
    }

    #[inline]
    fn read_u16(&mut self) -> Result<u16> {
        let at = self.advance(2)?;
        Ok(u16::from_be(unsafe { at.cast::<u16>().read_unaligned() }))
    }

    #[inline]
    fn read_u32(&mut self) -> Result<u32> {
        let at = self.advance(4)?;
        Ok(u32::from_be(unsafe { at.cast::<u32>().read_unaligned() }))
    }

    #[inline]
    fn read_u64(&mut self) -> Result<u64> {
        let at = self.advance(8)?;
        Ok(u64::from_be(unsafe { at.cast::<u64>().read_unaligned() }))
    }

    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        let at = self.advance(dst.len())?;
        if !dst.is_empty() {
            unsafe { ptr::copy_nonoverlapping(at, dst.as_mut_ptr(), dst.len()) };
        }
        Ok(())
    }

    fn skip_bytes(&mut self, n: usize) -> usize {
        let skipped = n.min(self.remaining());
        self.position += skipped;
        skipped
    }
}
