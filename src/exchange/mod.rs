//! In-process movement of flushed batches along one edge.
//!
//! This is the work the engine does between an upstream writer and the
//! downstream readers of an edge. It lets whole pipelines run inside one
//! process.

use crate::comparator::ComparatorBridge;
use crate::config::BufferConfig;
use crate::page::checked::{InputFragment, OutputFragment};
use crate::types::{EdgeKind, Result};

mod scatter_gather;

pub use scatter_gather::{ScatterGather, FRAGMENT_BYTES_THRESHOLD, MAX_GROUPS_PER_FRAGMENT};

/// Pages delivered to one downstream task.
#[derive(Clone, Debug)]
pub enum EdgeInput {
    /// One record per page.
    Values(Vec<InputFragment>),
    /// One group per page: key pages and the matching value pages.
    Grouped {
        /// Key fragments, one key per page.
        keys: Vec<InputFragment>,
        /// Value fragments, every value of a group in one page.
        values: Vec<InputFragment>,
    },
}

/// Collects upstream batches of one edge and turns them into downstream inputs.
pub trait EdgeProcessor {
    /// Accepts one flushed upstream batch.
    fn add(&mut self, fragment: OutputFragment) -> Result<()>;

    /// Produces the inputs of the downstream tasks and forgets the batches
    /// added so far.
    fn process(&mut self) -> Result<Vec<EdgeInput>>;
}

/// Hands every batch, in arrival order, to a single downstream task.
#[derive(Debug, Default)]
pub struct OneToOne {
    fragments: Vec<InputFragment>,
}

impl EdgeProcessor for OneToOne {
    fn add(&mut self, fragment: OutputFragment) -> Result<()> {
        self.fragments.push(fragment.into_input());
        Ok(())
    }

    fn process(&mut self) -> Result<Vec<EdgeInput>> {
        Ok(vec![EdgeInput::Values(std::mem::take(&mut self.fragments))])
    }
}

/// Gives every downstream task all batches.
#[derive(Debug)]
pub struct Broadcast {
    receivers: usize,
    fragments: Vec<InputFragment>,
}

impl Broadcast {
    /// Creates a broadcast to `receivers` tasks.
    pub fn new(receivers: usize) -> Self {
        Self {
            receivers,
            fragments: Vec::new(),
        }
    }
}

impl EdgeProcessor for Broadcast {
    fn add(&mut self, fragment: OutputFragment) -> Result<()> {
        self.fragments.push(fragment.into_input());
        Ok(())
    }

    fn process(&mut self) -> Result<Vec<EdgeInput>> {
        let fragments = std::mem::take(&mut self.fragments);
        Ok(vec![EdgeInput::Values(fragments); self.receivers])
    }
}

/// Edge that carries no data.
#[derive(Debug, Default)]
pub struct Nothing;

impl EdgeProcessor for Nothing {
    fn add(&mut self, _fragment: OutputFragment) -> Result<()> {
        Ok(())
    }

    fn process(&mut self) -> Result<Vec<EdgeInput>> {
        Ok(Vec::new())
    }
}

/// Builds the processor for an edge of `kind`.
///
/// Scatter-gather edges use `config.partition_count` partitions and resolve
/// `value_comparator` through `bridge`; broadcast edges deliver to
/// `config.partition_count` receivers.
pub fn processor_for(
    kind: EdgeKind,
    config: &BufferConfig,
    bridge: &ComparatorBridge,
    value_comparator: Option<&str>,
) -> Result<Box<dyn EdgeProcessor>> {
    let processor: Box<dyn EdgeProcessor> = match kind {
        EdgeKind::None => Box::new(Nothing),
        EdgeKind::OneToOne => Box::<OneToOne>::default(),
        EdgeKind::Broadcast => Box::new(Broadcast::new(config.partition_count)),
        EdgeKind::ScatterGather => {
            let comparator = bridge.resolve_for_edge(kind, value_comparator)?;
            Box::new(ScatterGather::new(config.partition_count, comparator)?)
        }
    };
    Ok(processor)
}
