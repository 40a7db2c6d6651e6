//! Page-oriented record buffers.
//!
//! A write session fills three regions supplied by the transport: the content
//! bytes, a page-offset table holding `pages + 1` base-relative offsets, and,
//! on keyed edges, a key-length table with one entry per page. The reader side
//! walks the same layout page by page.
//!
//! Two interchangeable backends implement [`PageInput`] and [`PageOutput`]:
//! [`checked`] works on owned, bounds-checked buffers, [`raw`] on base pointers
//! that only guard the backing allocation. Both write big-endian content and share the
//! helpers in [`layout`], so the bytes, tables and comparison results they
//! produce are identical.

use core::cmp::Ordering;

use crate::primitives::bytes::utf;
use crate::types::{BridgeError, Result};

pub mod checked;
pub mod layout;
pub mod raw;

pub use layout::{FlushPolicy, DEFAULT_FLUSH_FACTOR, MAX_FLUSH_FACTOR, MIN_FLUSH_FACTOR};

/// Sequential writer of typed fields into pages.
///
/// Implementors supply the fixed-width primitives; every other field encoding
/// is derived from them here so both backends encode identically.
pub trait PageOutput {
    /// Appends one byte.
    fn write_u8(&mut self, v: u8) -> Result<()>;
    /// Appends a big-endian `u16`.
    fn write_u16(&mut self, v: u16) -> Result<()>;
    /// Appends a big-endian `u32`.
    fn write_u32(&mut self, v: u32) -> Result<()>;
    /// Appends a big-endian `u64`.
    fn write_u64(&mut self, v: u64) -> Result<()>;
    /// Appends raw bytes.
    fn write_slice(&mut self, src: &[u8]) -> Result<()>;

    /// Records the bytes written since the page started as the page's key length.
    fn end_key(&mut self) -> Result<()>;

    /// Closes the current page and flushes if the flush policy says so.
    fn end_page(&mut self) -> Result<()>;

    /// Hands pending pages to the sink. Nothing is delivered when no page is
    /// pending. With `end_of_output` the session ends either way, and later
    /// writes fail with [`BridgeError::NoActiveSession`].
    fn flush(&mut self, end_of_output: bool) -> Result<()>;

    /// Number of pages closed in the current session.
    fn pending_pages(&self) -> usize;

    /// Current write position relative to the start of the content region.
    fn position(&self) -> usize;

    /// Appends a boolean as `0` or `1`.
    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(u8::from(v))
    }

    /// Appends a signed byte.
    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_u8(v as u8)
    }

    /// Appends a big-endian `i16`.
    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_u16(v as u16)
    }

    /// Appends one UTF-16 code unit.
    fn write_char(&mut self, unit: u16) -> Result<()> {
        self.write_u16(unit)
    }

    /// Appends a big-endian `i32`.
    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_u32(v as u32)
    }

    /// Appends a big-endian `i64`.
    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.write_u64(v as u64)
    }

    /// Appends the IEEE-754 bits of an `f32`.
    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_u32(v.to_bits())
    }

    /// Appends the IEEE-754 bits of an `f64`.
    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_u64(v.to_bits())
    }

    /// Appends the low byte of every UTF-16 code unit of `s`.
    fn write_ascii(&mut self, s: &str) -> Result<()> {
        for unit in s.encode_utf16() {
            self.write_u8(unit as u8)?;
        }
        Ok(())
    }

    /// Appends every UTF-16 code unit of `s` as two bytes.
    fn write_chars(&mut self, s: &str) -> Result<()> {
        for unit in s.encode_utf16() {
            self.write_u16(unit)?;
        }
        Ok(())
    }

    /// Widens each byte to a two-byte code unit.
    fn write_bytes_as_chars(&mut self, src: &[u8]) -> Result<()> {
        for &b in src {
            self.write_u16(u16::from(b))?;
        }
        Ok(())
    }

    /// Appends a length-prefixed modified UTF-8 string.
    fn write_utf(&mut self, s: &str) -> Result<()> {
        let len = utf::encoded_len(s);
        if len > utf::MAX_ENCODED_LEN {
            return Err(BridgeError::Utf("encoded string longer than 65535 bytes"));
        }
        self.write_u16(len as u16)?;
        let mut unit_buf = [0u8; 3];
        for unit in s.encode_utf16() {
            let n = utf::encode_unit(unit, &mut unit_buf);
            self.write_slice(&unit_buf[..n])?;
        }
        Ok(())
    }
}

/// Page-scoped cursor over content produced by a [`PageOutput`].
pub trait PageInput {
    /// Moves to the next page, pulling more regions from the source when the
    /// current table is exhausted. Returns `false` at end of stream.
    fn next_page(&mut self) -> bool;

    /// Bytes left unread in the current page.
    fn remaining(&self) -> usize;

    /// Returns whether unread bytes remain in the current page.
    fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Moves the read position back to the start of the current page.
    fn rewind(&mut self);

    /// Compares the unread parts of the current pages of `self` and `other`.
    fn compare_page(&self, other: &Self) -> Ordering
    where
        Self: Sized;

    /// Reads one byte.
    fn read_u8(&mut self) -> Result<u8>;
    /// Reads a big-endian `u16`.
    fn read_u16(&mut self) -> Result<u16>;
    /// Reads a big-endian `u32`.
    fn read_u32(&mut self) -> Result<u32>;
    /// Reads a big-endian `u64`.
    fn read_u64(&mut self) -> Result<u64>;
    /// Fills `dst` from the current page.
    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()>;
    /// Skips up to `n` bytes, stopping at the page end. Returns the bytes skipped.
    fn skip_bytes(&mut self, n: usize) -> usize;

    /// Reads a boolean; any non-zero byte is `true`.
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a signed byte.
    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a big-endian `i16`.
    fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads one UTF-16 code unit.
    fn read_char(&mut self) -> Result<u16> {
        self.read_u16()
    }

    /// Reads a big-endian `i32`.
    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a big-endian `i64`.
    fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads an `f32` from its IEEE-754 bits.
    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads an `f64` from its IEEE-754 bits.
    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a length-prefixed modified UTF-8 string.
    fn read_utf(&mut self) -> Result<String> {
        let len = usize::from(self.read_u16()?);
        let mut body = vec![0u8; len];
        self.read_exact(&mut body)?;
        utf::decode(&body)
    }

    /// Line-oriented reads are not part of the page format.
    fn read_line(&mut self) -> Result<String> {
        Err(BridgeError::Unsupported("read_line on page input"))
    }
}
