use std::collections::VecDeque;

use tracing::trace;

use crate::config::BufferConfig;
use crate::page::checked::{FragmentSink, InputFragment, OutputFragment};
use crate::types::{EdgeKind, Result};

/// Allocates checked output regions and keeps every delivered batch.
#[derive(Debug)]
pub struct FragmentPool {
    capacity: usize,
    max_pages: usize,
    keyed: bool,
    delivered: Vec<OutputFragment>,
    finished: bool,
}

impl FragmentPool {
    /// Creates a pool handing out regions of `capacity` bytes and `max_pages` pages.
    pub fn new(capacity: usize, max_pages: usize, keyed: bool) -> Self {
        Self {
            capacity,
            max_pages,
            keyed,
            delivered: Vec::new(),
            finished: false,
        }
    }

    /// Sizes regions from `config` for an edge of `kind`.
    pub fn for_edge(config: &BufferConfig, kind: EdgeKind) -> Self {
        Self::new(
            config.output_buffer_size,
            config.records_per_buffer,
            kind.is_keyed(),
        )
    }

    /// Batches delivered so far.
    pub fn delivered(&self) -> &[OutputFragment] {
        &self.delivered
    }

    /// Removes and returns the delivered batches.
    pub fn take_delivered(&mut self) -> Vec<OutputFragment> {
        std::mem::take(&mut self.delivered)
    }

    /// Returns whether the writer signalled end of output.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FragmentSink for FragmentPool {
    fn acquire(&mut self) -> Result<OutputFragment> {
        Ok(OutputFragment::allocate(
            self.capacity,
            self.max_pages,
            self.keyed,
        ))
    }

    fn deliver(&mut self, fragment: OutputFragment, end_of_output: bool) -> Result<()> {
        trace!(
            pages = fragment.page_count(),
            delivered = self.delivered.len() + 1,
            "transport.pool.deliver"
        );
        self.delivered.push(fragment);
        self.finished |= end_of_output;
        Ok(())
    }
}

/// Queue of input fragments read in order.
#[derive(Debug, Default, Clone)]
pub struct FragmentQueue {
    fragments: VecDeque<InputFragment>,
}

impl FragmentQueue {
    /// Creates a queue over `fragments`.
    pub fn new(fragments: impl IntoIterator<Item = InputFragment>) -> Self {
        Self {
            fragments: fragments.into_iter().collect(),
        }
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: InputFragment) {
        self.fragments.push_back(fragment);
    }

    /// Number of fragments not yet handed out.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns whether the queue is drained.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl Iterator for FragmentQueue {
    type Item = InputFragment;

    fn next(&mut self) -> Option<InputFragment> {
        self.fragments.pop_front()
    }
}
