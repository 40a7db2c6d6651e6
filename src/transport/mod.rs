//! In-process region providers.
//!
//! The engine normally owns the buffers behind every session. These types play
//! that role inside one process: they allocate output regions, keep delivered
//! batches, and feed batches back to readers.

mod edge;
mod pool;
mod raw;

pub use edge::EdgeWriter;
pub use pool::{FragmentPool, FragmentQueue};
pub use raw::{OwnedRawSource, RawArena, RawCollector};
