use std::ptr;

use tracing::{error, trace};

use super::region::{RawBatch, RawOutputRegion};
use crate::page::layout::{to_offset, FlushPolicy};
use crate::page::{PageOutput, DEFAULT_FLUSH_FACTOR};
use crate::types::{BridgeError, Result};

/// Receives flushed raw batches and supplies regions for the next session.
pub trait RawSink {
    /// Returns the regions for a new write session.
    fn acquire(&mut self) -> Result<RawOutputRegion>;

    /// Consumes a flushed batch. The batch memory may be reused once this returns.
    fn deliver(&mut self, batch: RawBatch<'_>, end_of_output: bool) -> Result<()>;
}

/// Page writer over raw base pointers.
///
/// Field writes are not checked against the declared capacity; running past
/// it is reported once the page closes and the flush policy fires. A field
/// that would leave the region's backing memory fails with
/// [`BridgeError::BufferOverflow`] before it is stored.
pub struct RawPageWriter<S> {
    sink: S,
    flush_factor: f32,
    region: Option<RawOutputRegion>,
    policy: FlushPolicy,
    position: usize,
    page_start: usize,
    pages: usize,
    key_ended: bool,
}

// SAFETY: the region contract gives the session exclusive access to its memory.
unsafe impl<S: Send> Send for RawPageWriter<S> {}

impl<S: RawSink> RawPageWriter<S> {
    /// Creates a writer with the default flush factor and starts a session.
    pub fn new(sink: S) -> Result<Self> {
        Self::with_flush_factor(sink, DEFAULT_FLUSH_FACTOR)
    }

    /// Creates a writer and starts a session with a region from `sink`.
    pub fn with_flush_factor(mut sink: S, flush_factor: f32) -> Result<Self> {
        let region = sink.acquire()?;
        let mut writer = Self {
            sink,
            flush_factor,
            region: None,
            policy: FlushPolicy::new(0, flush_factor, 0),
            position: 0,
            page_start: 0,
            pages: 0,
            key_ended: false,
        };
        writer.reset(region)?;
        Ok(writer)
    }

    /// Starts a new session over `region`, discarding unflushed pages.
    pub fn reset(&mut self, region: RawOutputRegion) -> Result<()> {
        let max_pages = region.max_pages();
        if max_pages == 0 {
            return Err(BridgeError::Invalid(
                "output region must hold at least one page",
            ));
        }
        self.policy = FlushPolicy::new(region.capacity(), self.flush_factor, max_pages);
        self.region = Some(region);
        self.position = 0;
        self.page_start = 0;
        self.pages = 0;
        self.key_ended = false;
        Ok(())
    }

    /// Flush policy of the current session.
    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    /// Returns the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the writer, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    #[inline]
    fn advance(&mut self, n: usize) -> Result<*mut u8> {
        let region = self.region.as_ref().ok_or(BridgeError::NoActiveSession)?;
        let end = self.position.saturating_add(n);
        if end > region.writable() {
            return Err(self.past_allocation(end));
        }
        // SAFETY: `end` is within the `writable` bytes the region was built over.
        let at = unsafe { region.contents_ptr().add(self.position) };
        self.position = end;
        Ok(at)
    }

    #[cold]
    fn past_allocation(&self, end: usize) -> BridgeError {
        let capacity = self.policy.capacity();
        error!(
            capacity,
            position = self.position,
            requested = end - self.position,
            "page.writer.overflow"
        );
        BridgeError::BufferOverflow {
            capacity,
            exceeded: end.saturating_sub(capacity),
            last_page: end - self.page_start,
        }
    }
}

impl<S: RawSink> PageOutput for RawPageWriter<S> {
    #[inline]
    fn write_u8(&mut self, v: u8) -> Result<()> {
        let at = self.advance(1)?;
        unsafe { at.write(v) };
        Ok(())
    }

    #[inline]
    fn write_u16(&mut self, v: u16) -> Result<()> {
        let at = self.advance(2)?;
        unsafe { at.cast::<u16>().write_unaligned(v.to_be()) };
        Ok(())
    }

    #[inline]
    fn write_u32(&mut self, v: u32) -> Result<()> {
        let at = self.advance(4)?;
        unsafe { at.cast::<u32>().write_unaligned(v.to_be()) };
        Ok(())
    }

    #[inline]
    fn write_u64(&mut self, v: u64) -> Result<()> {
        let at = self.advance(8)?;
        unsafe { at.cast::<u64>().write_unaligned(v.to_be()) };
        Ok(())
    }

    fn write_slice(&mut self, src: &[u8]) -> Result<()> {
        let at = self.advance(src.len())?;
        if !src.is_empty() {
            unsafe { ptr::copy_nonoverlapping(src.as_ptr(), at, src.len()) };
        }
        Ok(())
    }

    fn end_key(&mut self) -> Result<()> {
        let region = self.region.as_ref().ok_or(BridgeError::NoActiveSession)?;
        debug_assert!(!self.key_ended, "end_key called twice for one page");
        if !region.has_key() {
            return Err(BridgeError::NoKeyTable);
        }
        let len = (self.position - self.page_start) as u64;
        unsafe { region.key_lengths_ptr().add(self.pages).write(len) };
        self.key_ended = true;
        Ok(())
    }

    fn end_page(&mut self) -> Result<()> {
        let region = self.region.as_ref().ok_or(BridgeError::NoActiveSession)?;
        let offsets = region.offsets_ptr();
        let base = region.base();
        unsafe {
            if self.pages == 0 {
                offsets.write(to_offset(self.page_start, base));
            }
            offsets
                .add(self.pages + 1)
                .write(to_offset(self.position, base));
        }
        let last_page = self.position - self.page_start;
        self.pages += 1;
        self.page_start = self.position;
        self.key_ended = false;
        if self.policy.should_flush(self.position, self.pages) {
            if let Err(err) = self.policy.check_overflow(self.position, last_page) {
                error!(
                    capacity = self.policy.capacity(),
                    position = self.position,
                    last_page,
                    "page.writer.overflow"
                );
                self.region = None;
                self.pages = 0;
                return Err(err);
            }
            self.flush(false)?;
        }
        Ok(())
    }

    fn flush(&mut self, end_of_output: bool) -> Result<()> {
        if self.pages == 0 {
            if end_of_output {
                self.region = None;
            }
            return Ok(());
        }
        let Some(region) = self.region.take() else {
            return Ok(());
        };
        let pages = std::mem::take(&mut self.pages);
        trace!(
            contents = self.position,
            pages,
            keys = if region.has_key() { pages } else { 0 },
            end_of_output,
            "page.writer.flush"
        );
        self.sink
            .deliver(RawBatch::new(&region, self.position, pages), end_of_output)?;
        if !end_of_output {
            let next = self.sink.acquire()?;
            self.reset(next)?;
        }
        Ok(())
    }

    fn pending_pages(&self) -> usize {
        self.pages
    }

    fn position(&self) -> usize {
        self.position
    }
}
