use crate::page::{PageInput, PageOutput};
use crate::primitives::bytes::key;
use crate::types::{BridgeError, Result};

/// Serializes one value into the current page.
pub trait ValueCodec {
    /// Decoded value type.
    type Value;

    /// Writes `value` at the current position.
    fn encode<O: PageOutput>(&self, value: &Self::Value, out: &mut O) -> Result<()>;
    /// Reads one value from the current position.
    fn decode<I: PageInput>(&self, input: &mut I) -> Result<Self::Value>;
}

/// Serializes a record split into a key part and a value part.
pub trait KeyValueCodec {
    /// Record type.
    type Record;
    /// Decoded form of the key part.
    type Key;

    /// Writes the key part of `record`.
    fn encode_key<O: PageOutput>(&self, record: &Self::Record, out: &mut O) -> Result<()>;
    /// Writes the value part of `record`.
    fn encode_value<O: PageOutput>(&self, record: &Self::Record, out: &mut O) -> Result<()>;
    /// Reads a key from a key page.
    fn decode_key<I: PageInput>(&self, keys: &mut I) -> Result<Self::Key>;
    /// Rebuilds a record from its key page and the next value in the value page.
    fn decode_pair<I: PageInput>(&self, keys: &mut I, values: &mut I) -> Result<Self::Record>;
}

/// Big-endian `i32`.
#[derive(Clone, Copy, Debug, Default)]
pub struct I32Codec;

impl ValueCodec for I32Codec {
    type Value = i32;

    fn encode<O: PageOutput>(&self, value: &i32, out: &mut O) -> Result<()> {
        out.write_i32(*value)
    }

    fn decode<I: PageInput>(&self, input: &mut I) -> Result<i32> {
        input.read_i32()
    }
}

/// Big-endian `i64`.
#[derive(Clone, Copy, Debug, Default)]
pub struct I64Codec;

impl ValueCodec for I64Codec {
    type Value = i64;

    fn encode<O: PageOutput>(&self, value: &i64, out: &mut O) -> Result<()> {
        out.write_i64(*value)
    }

    fn decode<I: PageInput>(&self, input: &mut I) -> Result<i64> {
        input.read_i64()
    }
}

/// `i64` key whose bytes sort in numeric order, so scatter-gather groups
/// arrive from most negative to most positive.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderedI64Codec;

impl ValueCodec for OrderedI64Codec {
    type Value = i64;

    fn encode<O: PageOutput>(&self, value: &i64, out: &mut O) -> Result<()> {
        out.write_slice(&key::encode_i64(*value))
    }

    fn decode<I: PageInput>(&self, input: &mut I) -> Result<i64> {
        Ok(key::decode_i64(read_key(input)?))
    }
}

/// `f64` key whose bytes sort in numeric order. NaN is rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderedF64Codec;

impl ValueCodec for OrderedF64Codec {
    type Value = f64;

    fn encode<O: PageOutput>(&self, value: &f64, out: &mut O) -> Result<()> {
        if value.is_nan() {
            return Err(BridgeError::Invalid("NaN has no key order"));
        }
        out.write_slice(&key::encode_f64(*value))
    }

    fn decode<I: PageInput>(&self, input: &mut I) -> Result<f64> {
        Ok(key::decode_f64(read_key(input)?))
    }
}

fn read_key<I: PageInput>(input: &mut I) -> Result<[u8; 8]> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

/// Length-prefixed modified UTF-8 string.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringCodec;

impl ValueCodec for StringCodec {
    type Value = String;

    fn encode<O: PageOutput>(&self, value: &String, out: &mut O) -> Result<()> {
        out.write_utf(value)
    }

    fn decode<I: PageInput>(&self, input: &mut I) -> Result<String> {
        input.read_utf()
    }
}

/// `(key, value)` tuples encoded with one codec per part.
#[derive(Clone, Copy, Debug, Default)]
pub struct PairCodec<K, V> {
    key: K,
    value: V,
}

impl<K, V> PairCodec<K, V> {
    /// Combines a key codec and a value codec.
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

impl<K: ValueCodec, V: ValueCodec> KeyValueCodec for PairCodec<K, V> {
    type Record = (K::Value, V::Value);
    type Key = K::Value;

    fn encode_key<O: PageOutput>(&self, record: &Self::Record, out: &mut O) -> Result<()> {
        self.key.encode(&record.0, out)
    }

    fn encode_value<O: PageOutput>(&self, record: &Self::Record, out: &mut O) -> Result<()> {
        self.value.encode(&record.1, out)
    }

    fn decode_key<I: PageInput>(&self, keys: &mut I) -> Result<K::Value> {
        self.key.decode(keys)
    }

    fn decode_pair<I: PageInput>(&self, keys: &mut I, values: &mut I) -> Result<Self::Record> {
        let key = self.key.decode(keys)?;
        let value = self.value.decode(values)?;
        Ok((key, value))
    }
}
