//! Bounds-checked backend over owned buffers.

#![forbid(unsafe_code)]

mod fragment;
mod input;
mod output;

pub use fragment::{InputFragment, OutputFragment};
pub use input::{CheckedPageReader, FragmentSource};
pub use output::{CheckedPageWriter, FragmentSink};
