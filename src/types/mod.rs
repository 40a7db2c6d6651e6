#![forbid(unsafe_code)]
//! Error type and identifiers shared by every buffer component.

use std::fmt;

/// Errors surfaced by the page buffer layer.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// I/O failure while loading configuration or native libraries.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// The write position passed the declared content capacity.
    #[error(
        "page buffer overflow: buffer-size={capacity}, exceeded={exceeded}, last-page-size={last_page}"
    )]
    BufferOverflow {
        /// Declared capacity of the content region.
        capacity: usize,
        /// Number of bytes written past the capacity.
        exceeded: usize,
        /// Size of the page that was being written.
        last_page: usize,
    },
    /// A read asked for more bytes than the current page holds.
    #[error("read past page end: requested {requested} bytes, {remaining} remaining")]
    PageBounds {
        /// Bytes requested by the read.
        requested: usize,
        /// Bytes left in the current page.
        remaining: usize,
    },
    /// `end_key` was called twice for the same page.
    #[error("key already ended for the current page")]
    KeyAlreadyEnded,
    /// `end_key` was called on a writer without a key-length table.
    #[error("writer has no key-length table")]
    NoKeyTable,
    /// The writer has no region to write into.
    #[error("no active write session")]
    NoActiveSession,
    /// A comparator identifier could not be resolved.
    #[error("comparator not found: {0}")]
    ComparatorNotFound(String),
    /// A comparator failed while comparing two values.
    #[error("comparator failed: {0}")]
    Comparator(String),
    /// A string could not be encoded or decoded.
    #[error("malformed string: {0}")]
    Utf(&'static str),
    /// The operation is not supported by page inputs.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// Configuration could not be parsed.
    #[error("configuration: {0}")]
    Config(String),
    /// An argument violated a documented precondition.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// How records move along a dataflow edge.
///
/// Only [`EdgeKind::ScatterGather`] carries keyed pages and a value comparator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EdgeKind {
    /// The edge carries no data.
    None,
    /// Each upstream task feeds exactly one downstream task.
    OneToOne,
    /// Every downstream task receives every record.
    Broadcast,
    /// Records are partitioned by key and sorted within each partition.
    ScatterGather,
}

impl EdgeKind {
    /// Returns whether pages on this edge carry a key prefix.
    pub const fn is_keyed(self) -> bool {
        matches!(self, EdgeKind::ScatterGather)
    }

    /// Returns the engine-side movement id.
    ///
    /// `None` maps onto an empty broadcast.
    pub const fn id(self) -> u32 {
        match self {
            EdgeKind::None => 3,
            EdgeKind::OneToOne => 1,
            EdgeKind::ScatterGather => 2,
            EdgeKind::Broadcast => 3,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::None => "none",
            EdgeKind::OneToOne => "one-to-one",
            EdgeKind::Broadcast => "broadcast",
            EdgeKind::ScatterGather => "scatter-gather",
        };
        f.write_str(name)
    }
}
