#![allow(unsafe_code)]

use std::collections::VecDeque;

use crate::page::checked::{InputFragment, OutputFragment};
use crate::page::layout::to_position;
use crate::page::raw::{RawBatch, RawInputRegion, RawOutputRegion, RawRegionSource, RawSink};
use crate::types::Result;

/// Owned memory backing one raw output region.
pub struct RawArena {
    contents: Vec<u8>,
    capacity: usize,
    offsets: Vec<u64>,
    key_lengths: Option<Vec<u64>>,
    address_base: bool,
}

impl RawArena {
    /// Allocates `capacity` content bytes and tables for `max_pages` pages.
    pub fn new(capacity: usize, max_pages: usize, keyed: bool) -> Self {
        Self {
            contents: vec![0; capacity],
            capacity,
            offsets: vec![0; max_pages + 1],
            key_lengths: keyed.then(|| vec![0; max_pages]),
            address_base: false,
        }
    }

    /// Adds `slack` bytes behind the declared capacity. Writes may run into
    /// the slack until the page closes and the overflow check fires; without
    /// it a field crossing the capacity fails as it is written.
    pub fn with_slack(mut self, slack: usize) -> Self {
        self.contents.resize(self.capacity + slack, 0);
        self
    }

    /// Uses the content address as the table base, making offsets native
    /// addresses.
    pub fn with_address_base(mut self) -> Self {
        self.address_base = true;
        self
    }

    /// Declared content capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Describes this arena as a raw output region.
    ///
    /// The region points into the arena; it must not be used after the arena
    /// is dropped or handed out again.
    fn region(&mut self) -> RawOutputRegion {
        let contents = self.contents.as_mut_ptr();
        let base = if self.address_base {
            contents as u64
        } else {
            0
        };
        let (keys, key_slots) = match &mut self.key_lengths {
            Some(keys) => (keys.as_mut_ptr(), keys.len()),
            None => (std::ptr::null_mut(), 0),
        };
        // SAFETY: all three buffers are owned by the arena, disjoint, and sized
        // as described; the collector hands out one region at a time.
        unsafe {
            RawOutputRegion::from_raw_parts(
                base,
                contents,
                self.capacity,
                self.contents.len(),
                self.offsets.as_mut_ptr(),
                self.offsets.len(),
                keys,
                key_slots,
            )
        }
    }
}

/// A [`RawSink`] that reuses one arena and copies every delivered batch into
/// an [`OutputFragment`] rebased to zero.
pub struct RawCollector {
    arena: RawArena,
    fragments: Vec<OutputFragment>,
    last_base: u64,
    finished: bool,
}

impl RawCollector {
    /// Creates a collector over `arena`.
    pub fn new(arena: RawArena) -> Self {
        Self {
            arena,
            fragments: Vec::new(),
            last_base: 0,
            finished: false,
        }
    }

    /// Collected batches.
    pub fn fragments(&self) -> &[OutputFragment] {
        &self.fragments
    }

    /// Consumes the collector, returning the collected batches.
    pub fn into_fragments(self) -> Vec<OutputFragment> {
        self.fragments
    }

    /// Table base of the most recent batch.
    pub fn last_base(&self) -> u64 {
        self.last_base
    }

    /// Returns whether the writer signalled end of output.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl RawSink for RawCollector {
    fn acquire(&mut self) -> Result<RawOutputRegion> {
        Ok(self.arena.region())
    }

    fn deliver(&mut self, batch: RawBatch<'_>, end_of_output: bool) -> Result<()> {
        let base = batch.base();
        let pages = batch.page_count();
        let offsets: Vec<u64> = batch
            .offsets()
            .iter()
            .map(|&offset| to_position(offset, base) as u64)
            .collect();
        let keys = self
            .arena
            .key_lengths
            .is_some()
            .then(|| batch.key_lengths().to_vec().into_boxed_slice());
        let contents = batch.contents();
        let mut fragment = OutputFragment::new(
            0,
            contents.to_vec().into_boxed_slice(),
            offsets.into_boxed_slice(),
            keys,
        );
        fragment.seal(contents.len(), pages);
        self.fragments.push(fragment);
        self.last_base = base;
        self.finished |= end_of_output;
        Ok(())
    }
}

/// A [`RawRegionSource`] over owned fragments.
///
/// The fragment behind the region most recently handed out stays alive until
/// the next call.
#[derive(Default)]
pub struct OwnedRawSource {
    pending: VecDeque<InputFragment>,
    current: Option<InputFragment>,
}

impl OwnedRawSource {
    /// Creates a source over `fragments`.
    pub fn new(fragments: impl IntoIterator<Item = InputFragment>) -> Self {
        Self {
            pending: fragments.into_iter().collect(),
            current: None,
        }
    }
}

impl RawRegionSource for OwnedRawSource {
    fn next_region(&mut self) -> Option<RawInputRegion> {
        let fragment = self.current.insert(self.pending.pop_front()?);
        let offsets = fragment.offsets();
        // InputFragment validated its offsets against its contents, and both
        // buffers stay put while `current` holds the fragment.
        Some(unsafe {
            RawInputRegion::from_raw_parts(
                fragment.base(),
                fragment.contents().as_ptr(),
                offsets.as_ptr(),
                offsets.len(),
            )
        })
    }
}
