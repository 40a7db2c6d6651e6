use tracing::{error, trace};

use super::fragment::OutputFragment;
use crate::page::layout::{to_offset, FlushPolicy};
use crate::page::{PageOutput, DEFAULT_FLUSH_FACTOR};
use crate::types::{BridgeError, Result};

/// Receives flushed batches and supplies the regions for the next session.
pub trait FragmentSink {
    /// Returns empty regions for a new write session.
    fn acquire(&mut self) -> Result<OutputFragment>;

    /// Takes ownership of a flushed batch.
    ///
    /// `end_of_output` is set when the writer will never write again.
    fn deliver(&mut self, fragment: OutputFragment, end_of_output: bool) -> Result<()>;
}

/// Bounds-checked page writer.
///
/// A field that would not fit in the content region fails with
/// [`BridgeError::BufferOverflow`] before any byte of it is written.
pub struct CheckedPageWriter<S> {
    sink: S,
    flush_factor: f32,
    region: Option<OutputFragment>,
    policy: FlushPolicy,
    position: usize,
    page_start: usize,
    pages: usize,
    key_ended: bool,
}

impl<S: FragmentSink> CheckedPageWriter<S> {
    /// Creates a writer with the default flush factor and starts a session.
    pub fn new(sink: S) -> Result<Self> {
        Self::with_flush_factor(sink, DEFAULT_FLUSH_FACTOR)
    }

    /// Creates a writer and starts a session with regions from `sink`.
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
    pub fn reset(&mut self, mut region: OutputFragment) -> Result<()> {
        let max_pages = region.max_pages();
        if max_pages == 0 {
            return Err(BridgeError::Invalid(
                "output region must hold at least one page",
            ));
        }
        region.seal(0, 0);
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

    fn reserve(&mut self, n: usize) -> Result<&mut [u8]> {
        let region = self.region.as_mut().ok_or(BridgeError::NoActiveSession)?;
        let end = self.position + n;
        let capacity = region.capacity();
        if end > capacity {
            error!(
                capacity,
                requested = n,
                page = end - self.page_start,
                "page.writer.overflow"
            );
            return Err(BridgeError::BufferOverflow {
                capacity,
                exceeded: end - capacity,
                last_page: end - self.page_start,
            });
        }
        let start = self.position;
        self.position = end;
        let (contents, _, _) = region.parts_mut();
        Ok(&mut contents[start..end])
    }
}

impl<S: FragmentSink> PageOutput for CheckedPageWriter<S> {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.reserve(1)?[0] = v;
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_slice(&v.to_be_bytes())
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_slice(&v.to_be_bytes())
    }

    fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_slice(&v.to_be_bytes())
    }

    fn write_slice(&mut self, src: &[u8]) -> Result<()> {
        self.reserve(src.len())?.copy_from_slice(src);
        Ok(())
    }

    fn end_key(&mut self) -> Result<()> {
        let region = self.region.as_mut().ok_or(BridgeError::NoActiveSession)?;
        if self.key_ended {
            return Err(BridgeError::KeyAlreadyEnded);
        }
        let (_, _, keys) = region.parts_mut();
        let keys = keys.ok_or(BridgeError::NoKeyTable)?;
        keys[self.pages] = (self.position - self.page_start) as u64;
        self.key_ended = true;
        Ok(())
    }

    fn end_page(&mut self) -> Result<()> {
        let region = self.region.as_mut().ok_or(BridgeError::NoActiveSession)?;
        let base = region.base();
        let (_, offsets, _) = region.parts_mut();
        if self.pages == 0 {
            offsets[0] = to_offset(self.page_start, base);
        }
        offsets[self.pages + 1] = to_offset(self.position, base);
        let last_page = self.position - self.page_start;
        self.pages += 1;
        self.page_start = self.position;
        self.key_ended = false;
        if self.policy.should_flush(self.position, self.pages) {
            self.policy.check_overflow(self.position, last_page)?;
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
        let Some(mut region) = self.region.take() else {
            return Ok(());
        };
        region.seal(self.position, self.pages);
        trace!(
            contents = self.position,
            pages = self.pages,
            keys = region.key_lengths().len(),
            end_of_output,
            "page.writer.flush"
        );
        self.pages = 0;
        self.sink.deliver(region, end_of_output)?;
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
