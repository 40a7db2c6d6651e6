//! Raw-pointer backend.
//!
//! Regions are described by base pointers handed in by the transport, and
//! fields are moved with unaligned loads and stores. Content stays big-endian
//! so batches are byte-identical to the [`checked`](super::checked) backend.

#![allow(unsafe_code)]

mod input;
mod output;
mod region;

pub use input::{RawPageReader, RawRegionSource};
pub use output::{RawPageWriter, RawSink};
pub use region::{RawBatch, RawInputRegion, RawOutputRegion};
