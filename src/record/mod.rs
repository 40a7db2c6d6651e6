//! Record-level bridges over the page capabilities.
//!
//! Writers put one record per page; on keyed edges the key part is closed
//! with `end_key` before the value part is written. Readers see either one
//! record per page, or, after a scatter-gather exchange, a key page and a
//! value page per group where the value page holds every value of the group.

use core::cmp::Ordering;

use crate::page::{PageInput, PageOutput};
use crate::types::{BridgeError, Result};

mod codec;

pub use codec::{
    I32Codec, I64Codec, KeyValueCodec, OrderedF64Codec, OrderedI64Codec, PairCodec, StringCodec,
    ValueCodec,
};

/// Writes one record per page on unkeyed edges.
pub struct ValueWriter<O, C> {
    output: O,
    codec: C,
}

impl<O: PageOutput, C: ValueCodec> ValueWriter<O, C> {
    /// Wraps `output`.
    pub fn new(output: O, codec: C) -> Self {
        Self { output, codec }
    }

    /// Encodes `value` into its own page.
    pub fn put(&mut self, value: &C::Value) -> Result<()> {
        self.codec.encode(value, &mut self.output)?;
        self.output.end_page()
    }

    /// Returns the page writer.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Flushes with end of output and returns the page writer.
    pub fn close(mut self) -> Result<O> {
        self.output.flush(true)?;
        Ok(self.output)
    }
}

/// Writes keyed records, one per page, on scatter-gather edges.
pub struct KeyValueWriter<O, C> {
    output: O,
    codec: C,
}

impl<O: PageOutput, C: KeyValueCodec> KeyValueWriter<O, C> {
    /// Wraps `output`.
    pub fn new(output: O, codec: C) -> Self {
        Self { output, codec }
    }

    /// Encodes the key, closes it, then encodes the value and closes the page.
    pub fn put(&mut self, record: &C::Record) -> Result<()> {
        self.codec.encode_key(record, &mut self.output)?;
        self.output.end_key()?;
        self.codec.encode_value(record, &mut self.output)?;
        self.output.end_page()
    }

    /// Returns the page writer.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Flushes with end of output and returns the page writer.
    pub fn close(mut self) -> Result<O> {
        self.output.flush(true)?;
        Ok(self.output)
    }
}

/// Reads one record per page.
pub struct ValueReader<I, C> {
    input: I,
    codec: C,
}

impl<I: PageInput, C: ValueCodec> ValueReader<I, C> {
    /// Wraps `input`.
    pub fn new(input: I, codec: C) -> Self {
        Self { input, codec }
    }

    /// Decodes the record of the next page, or `None` at end of stream.
    pub fn next_record(&mut self) -> Result<Option<C::Value>> {
        if !self.input.next_page() {
            return Ok(None);
        }
        self.codec.decode(&mut self.input).map(Some)
    }

    /// Returns the page cursor.
    pub fn into_input(self) -> I {
        self.input
    }
}

/// Reads grouped records from a key cursor and a value cursor.
pub struct GroupReader<I, C> {
    keys: I,
    values: I,
    codec: C,
}

impl<I: PageInput, C: KeyValueCodec> GroupReader<I, C> {
    /// Wraps the key and value cursors of one partition.
    pub fn new(keys: I, values: I, codec: C) -> Self {
        Self {
            keys,
            values,
            codec,
        }
    }

    /// Advances both cursors to the next group.
    pub fn next_group(&mut self) -> Result<bool> {
        if !self.keys.next_page() {
            return Ok(false);
        }
        if !self.values.next_page() {
            return Err(BridgeError::Invalid("key page without a value page"));
        }
        Ok(true)
    }

    /// Decodes the key of the current group. The key page is rewound
    /// afterwards so the key can be read again.
    pub fn group_key(&mut self) -> Result<C::Key> {
        let key = self.codec.decode_key(&mut self.keys);
        self.keys.rewind();
        key
    }

    /// Decodes the next record of the current group, or `None` once the value
    /// page is exhausted.
    pub fn next_record(&mut self) -> Result<Option<C::Record>> {
        if !self.values.has_remaining() {
            return Ok(None);
        }
        let record = self.codec.decode_pair(&mut self.keys, &mut self.values);
        self.keys.rewind();
        record.map(Some)
    }

    /// Orders the current groups of two readers by their key bytes.
    pub fn compare_groups(&self, other: &Self) -> Ordering {
        self.keys.compare_page(&other.keys)
    }

    /// Returns the key and value cursors.
    pub fn into_inputs(self) -> (I, I) {
        (self.keys, self.values)
    }
}
