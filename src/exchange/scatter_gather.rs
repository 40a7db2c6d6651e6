use core::cmp::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use super::{EdgeInput, EdgeProcessor};
use crate::comparator::ValueComparator;
use crate::page::checked::{InputFragment, OutputFragment};
use crate::types::{BridgeError, Result};

/// Groups per output fragment.
pub const MAX_GROUPS_PER_FRAGMENT: usize = 1023;

/// Key or value bytes after which an output fragment is closed.
pub const FRAGMENT_BYTES_THRESHOLD: usize = 250 * 1024;

/// Partitions keyed pages by key hash, sorts each partition, and regroups it
/// into key fragments (one key per page) and value fragments (every value of
/// the group in one page).
pub struct ScatterGather {
    partitions: usize,
    comparator: Option<Arc<dyn ValueComparator>>,
    upstreams: Vec<OutputFragment>,
}

#[derive(Clone, Copy)]
struct Entry {
    fragment: usize,
    page: usize,
}

impl ScatterGather {
    /// Creates an exchange over `partitions` partitions. Values with equal
    /// keys are ordered by `comparator` when one is given.
    pub fn new(partitions: usize, comparator: Option<Arc<dyn ValueComparator>>) -> Result<Self> {
        if partitions == 0 {
            return Err(BridgeError::Invalid("scatter-gather needs at least one partition"));
        }
        Ok(Self {
            partitions,
            comparator,
            upstreams: Vec::new(),
        })
    }

    fn key(&self, entry: Entry) -> &[u8] {
        self.upstreams[entry.fragment]
            .key(entry.page)
            .unwrap_or_default()
    }

    fn value(&self, entry: Entry) -> &[u8] {
        self.upstreams[entry.fragment]
            .value(entry.page)
            .unwrap_or_default()
    }

    fn partition_of(&self, key: &[u8]) -> usize {
        (xxh64(key, 0) % self.partitions as u64) as usize
    }

    fn sort(&self, entries: &mut [Entry]) -> Result<()> {
        let mut failure = None;
        entries.sort_by(|&a, &b| {
            let by_key = self.key(a).cmp(self.key(b));
            match (&self.comparator, by_key) {
                (Some(cmp), Ordering::Equal) => {
                    cmp.compare(self.value(a), self.value(b))
                        .unwrap_or_else(|err| {
                            failure.get_or_insert(err);
                            Ordering::Equal
                        })
                }
                _ => by_key,
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn build(&self, entries: &[Entry]) -> Result<(Vec<InputFragment>, Vec<InputFragment>)> {
        let mut builder = GroupBuilder::default();
        let mut last_key: Option<&[u8]> = None;
        for &entry in entries {
            let key = self.key(entry);
            if last_key != Some(key) {
                if builder.is_full() {
                    builder.finish_fragment()?;
                }
                builder.start_group(key);
                last_key = Some(key);
            }
            builder.push_value(self.value(entry));
        }
        builder.finish()
    }
}

impl EdgeProcessor for ScatterGather {
    fn add(&mut self, fragment: OutputFragment) -> Result<()> {
        if !fragment.has_key() {
            return Err(BridgeError::NoKeyTable);
        }
        self.upstreams.push(fragment);
        Ok(())
    }

    fn process(&mut self) -> Result<Vec<EdgeInput>> {
        let mut partitions = vec![Vec::new(); self.partitions];
        for (fragment, upstream) in self.upstreams.iter().enumerate() {
            for page in 0..upstream.page_count() {
                let entry = Entry { fragment, page };
                partitions[self.partition_of(self.key(entry))].push(entry);
            }
        }
        let mut inputs = Vec::with_capacity(self.partitions);
        for (index, entries) in partitions.iter_mut().enumerate() {
            self.sort(entries)?;
            let (keys, values) = self.build(entries)?;
            debug!(
                partition = index,
                entries = entries.len(),
                fragments = keys.len(),
                "exchange.scatter_gather.partition"
            );
            inputs.push(EdgeInput::Grouped { keys, values });
        }
        self.upstreams.clear();
        Ok(inputs)
    }
}

#[derive(Default)]
struct GroupBuilder {
    keys: Vec<u8>,
    key_offsets: Vec<u64>,
    values: Vec<u8>,
    value_offsets: Vec<u64>,
    groups: usize,
    key_fragments: Vec<InputFragment>,
    value_fragments: Vec<InputFragment>,
}

impl GroupBuilder {
    fn is_full(&self) -> bool {
        self.groups >= MAX_GROUPS_PER_FRAGMENT
            || self.keys.len() >= FRAGMENT_BYTES_THRESHOLD
            || self.values.len() >= FRAGMENT_BYTES_THRESHOLD
    }

    fn start_group(&mut self, key: &[u8]) {
        if self.groups == 0 {
            self.key_offsets.push(0);
        }
        self.keys.extend_from_slice(key);
        self.key_offsets.push(self.keys.len() as u64);
        self.value_offsets.push(self.values.len() as u64);
        self.groups += 1;
    }

    fn push_value(&mut self, value: &[u8]) {
        self.values.extend_from_slice(value);
    }

    fn finish_fragment(&mut self) -> Result<()> {
        if self.groups == 0 {
            return Ok(());
        }
        self.value_offsets.push(self.values.len() as u64);
        let keys = fragment(&mut self.keys, &mut self.key_offsets)?;
        let values = fragment(&mut self.values, &mut self.value_offsets)?;
        self.key_fragments.push(keys);
        self.value_fragments.push(values);
        self.groups = 0;
        Ok(())
    }

    fn finish(mut self) -> Result<(Vec<InputFragment>, Vec<InputFragment>)> {
        self.finish_fragment()?;
        Ok((self.key_fragments, self.value_fragments))
    }
}

fn fragment(contents: &mut Vec<u8>, offsets: &mut Vec<u64>) -> Result<InputFragment> {
    let contents = Bytes::from(std::mem::take(contents));
    let offsets: Arc<[u64]> = std::mem::take(offsets).into();
    InputFragment::new(0, contents, offsets)
}
