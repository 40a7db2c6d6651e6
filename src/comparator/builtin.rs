//! Comparators for values serialized by the page writers.
//!
//! Every function answers `a < b` for one big-endian encoded value at the
//! start of each span.

use crate::primitives::bytes::utf;
use crate::types::{BridgeError, Result};

/// Signature shared by in-process comparator functions.
pub type LessFn = fn(&[u8], &[u8]) -> Result<bool>;

/// Built-in comparators by identifier.
pub const BUILTINS: &[(&str, LessFn)] = &[
    ("lt_int32", lt_int32),
    ("lt_int64", lt_int64),
    ("lt_float64", lt_float64),
    ("lt_utf", lt_utf),
];

fn head<const N: usize>(name: &str, value: &[u8]) -> Result<[u8; N]> {
    value
        .get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| {
            BridgeError::Comparator(format!(
                "{name}: value has {} bytes, needs {N}",
                value.len()
            ))
        })
}

/// Orders signed 32-bit integers.
pub fn lt_int32(a: &[u8], b: &[u8]) -> Result<bool> {
    let x = i32::from_be_bytes(head("lt_int32", a)?);
    let y = i32::from_be_bytes(head("lt_int32", b)?);
    Ok(x < y)
}

/// Orders signed 64-bit integers.
pub fn lt_int64(a: &[u8], b: &[u8]) -> Result<bool> {
    let x = i64::from_be_bytes(head("lt_int64", a)?);
    let y = i64::from_be_bytes(head("lt_int64", b)?);
    Ok(x < y)
}

/// Orders doubles with IEEE `<`; NaN is never less than anything.
pub fn lt_float64(a: &[u8], b: &[u8]) -> Result<bool> {
    let x = f64::from_bits(u64::from_be_bytes(head("lt_float64", a)?));
    let y = f64::from_bits(u64::from_be_bytes(head("lt_float64", b)?));
    Ok(x < y)
}

/// Orders length-prefixed strings by UTF-16 code units.
pub fn lt_utf(a: &[u8], b: &[u8]) -> Result<bool> {
    let x = utf_value(a)?;
    let y = utf_value(b)?;
    Ok(x.encode_utf16().lt(y.encode_utf16()))
}

fn utf_value(value: &[u8]) -> Result<String> {
    let len = usize::from(u16::from_be_bytes(head("lt_utf", value)?));
    let body = value.get(2..2 + len).ok_or_else(|| {
        BridgeError::Comparator(format!("lt_utf: string body truncated to {} bytes", value.len()))
    })?;
    utf::decode(body)
}
