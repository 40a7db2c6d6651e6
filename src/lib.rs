//! Page-oriented record buffers shared between a task runtime and a native
//! dataflow engine.
//!
//! Records are serialized into pages inside transport-owned regions: a content
//! region, a page-offset table and, on keyed edges, a key-length table.
//! [`page`] defines the cursor and writer capabilities with a bounds-checked
//! and a raw-pointer backend, [`comparator`] maps comparator identifiers to
//! byte-span orderings, and [`record`], [`exchange`] and [`transport`] wire
//! the pieces into in-process pipelines.

#![warn(missing_docs)]

pub mod comparator;
pub mod config;
pub mod exchange;
pub mod logging;
pub mod page;
pub mod primitives;
pub mod record;
pub mod transport;
pub mod types;

pub use comparator::{ComparatorBridge, ValueComparator};
pub use config::{AccessMode, BufferConfig};
pub use page::{PageInput, PageOutput};
pub use types::{BridgeError, EdgeKind, Result};
