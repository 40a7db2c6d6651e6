//! Low-level primitives shared by the page backends.

/// Byte-level encoding and comparison helpers.
///
/// Order-preserving key encodings, the modified UTF-8 string codec, and the
/// region ordering used by both the bounds-checked and the raw-pointer
/// backends.
pub mod bytes;
