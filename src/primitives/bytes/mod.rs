#![forbid(unsafe_code)]
//! Encoding and comparison helpers shared by both page backends.

pub mod key {
    //! Order-preserving fixed-width key encodings.
    //!
    //! Scatter-gather orders keys by their unsigned bytes. These encodings make
    //! that byte order agree with numeric order for signed and floating keys.

    const SIGN: u64 = 1 << 63;

    /// Encodes `v` with the sign bit flipped, big-endian.
    #[inline]
    pub fn encode_i64(v: i64) -> [u8; 8] {
        ((v as u64) ^ SIGN).to_be_bytes()
    }

    /// Inverse of [`encode_i64`].
    #[inline]
    pub fn decode_i64(key: [u8; 8]) -> i64 {
        (u64::from_be_bytes(key) ^ SIGN) as i64
    }

    /// Encodes a non-NaN `v`. Negative values have every bit inverted,
    /// positive ones only the sign bit, so `-0.0` sorts right before `0.0`.
    #[inline]
    pub fn encode_f64(v: f64) -> [u8; 8] {
        let bits = v.to_bits();
        let mask = if bits & SIGN == 0 { SIGN } else { u64::MAX };
        (bits ^ mask).to_be_bytes()
    }

    /// Inverse of [`encode_f64`].
    #[inline]
    pub fn decode_f64(key: [u8; 8]) -> f64 {
        let bits = u64::from_be_bytes(key);
        let mask = if bits & SIGN == 0 { u64::MAX } else { SIGN };
        f64::from_bits(bits ^ mask)
    }
}

pub mod utf {
    //! Length-prefixed modified UTF-8.
    //!
    //! Strings are encoded as UTF-16 code units: `U+0001..=U+007F` take one
    //! byte, `U+0000` and `U+0080..=U+07FF` two bytes, everything else three.
    //! Supplementary characters are written as two three-byte surrogates. The
    //! body is preceded by its byte length as a big-endian `u16`.

    use crate::types::{BridgeError, Result};

    /// Largest encodable body length.
    pub const MAX_ENCODED_LEN: usize = u16::MAX as usize;

    /// Returns the body length of `s` without the length prefix.
    pub fn encoded_len(s: &str) -> usize {
        s.encode_utf16().map(unit_len).sum()
    }

    fn unit_len(unit: u16) -> usize {
        match unit {
            0x0001..=0x007f => 1,
            0x0000 | 0x0080..=0x07ff => 2,
            _ => 3,
        }
    }

    /// Encodes one UTF-16 code unit into `dst`, returning the bytes used.
    pub fn encode_unit(unit: u16, dst: &mut [u8; 3]) -> usize {
        match unit {
            0x0001..=0x007f => {
                dst[0] = unit as u8;
                1
            }
            0x0000 | 0x0080..=0x07ff => {
                dst[0] = 0xc0 | ((unit >> 6) & 0x1f) as u8;
                dst[1] = 0x80 | (unit & 0x3f) as u8;
                2
            }
            _ => {
                dst[0] = 0xe0 | ((unit >> 12) & 0x0f) as u8;
                dst[1] = 0x80 | ((unit >> 6) & 0x3f) as u8;
                dst[2] = 0x80 | (unit & 0x3f) as u8;
                3
            }
        }
    }

    /// Appends the length prefix and body of `s` to `out`.
    pub fn encode(s: &str, out: &mut Vec<u8>) -> Result<()> {
        let len = encoded_len(s);
        if len > MAX_ENCODED_LEN {
            return Err(BridgeError::Utf("encoded string longer than 65535 bytes"));
        }
        out.reserve(len + 2);
        out.extend_from_slice(&(len as u16).to_be_bytes());
        let mut unit_buf = [0u8; 3];
        for unit in s.encode_utf16() {
            let n = encode_unit(unit, &mut unit_buf);
            out.extend_from_slice(&unit_buf[..n]);
        }
        Ok(())
    }

    /// Decodes a body (without its length prefix).
    pub fn decode(body: &[u8]) -> Result<String> {
        let mut units = Vec::with_capacity(body.len());
        let mut i = 0;
        while i < body.len() {
            let b0 = body[i];
            match b0 >> 4 {
                0x0..=0x7 => {
                    units.push(u16::from(b0));
                    i += 1;
                }
                0xc | 0xd => {
                    let b1 = continuation(body, i + 1)?;
                    units.push((u16::from(b0 & 0x1f) << 6) | u16::from(b1 & 0x3f));
                    i += 2;
                }
                0xe => {
                    let b1 = continuation(body, i + 1)?;
                    let b2 = continuation(body, i + 2)?;
                    units.push(
                        (u16::from(b0 & 0x0f) << 12)
                            | (u16::from(b1 & 0x3f) << 6)
                            | u16::from(b2 & 0x3f),
                    );
                    i += 3;
                }
                _ => return Err(BridgeError::Utf("invalid lead byte")),
            }
        }
        char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| BridgeError::Utf("unpaired surrogate"))
    }

    fn continuation(body: &[u8], at: usize) -> Result<u8> {
        let b = *body
            .get(at)
            .ok_or(BridgeError::Utf("truncated multi-byte sequence"))?;
        if b & 0xc0 != 0x80 {
            return Err(BridgeError::Utf("invalid continuation byte"));
        }
        Ok(b)
    }
}

pub mod cmp {
    //! Byte-region ordering shared by the page cursors.

    use core::cmp::Ordering;

    /// Regions at most this long are compared without the word loop.
    pub const SMALL_REGION: usize = 8 * 4;

    /// Orders two words loaded from memory in big-endian order.
    ///
    /// Loading with `from_be_bytes` makes the integer order equal to the
    /// byte-wise order of the source bytes on every host.
    #[inline]
    pub fn compare_word(a: u64, b: u64) -> Ordering {
        a.cmp(&b)
    }

    /// Lexicographic unsigned byte comparison, shorter-is-less.
    pub fn compare_regions(a: &[u8], b: &[u8]) -> Ordering {
        let prefix = a.len().min(b.len());
        let (head_a, head_b) = (&a[..prefix], &b[..prefix]);
        let diff = if prefix <= SMALL_REGION {
            compare_bytes(head_a, head_b)
        } else {
            compare_words(head_a, head_b)
        };
        diff.then(a.len().cmp(&b.len()))
    }

    fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
        for (x, y) in a.iter().zip(b) {
            match x.cmp(y) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    fn compare_words(a: &[u8], b: &[u8]) -> Ordering {
        let mut chunks_a = a.chunks_exact(8);
        let mut chunks_b = b.chunks_exact(8);
        for (wa, wb) in (&mut chunks_a).zip(&mut chunks_b) {
            let (x, y) = (word(wa), word(wb));
            if x != y {
                return compare_word(x, y);
            }
        }
        compare_bytes(chunks_a.remainder(), chunks_b.remainder())
    }

    fn word(chunk: &[u8]) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(chunk);
        u64::from_be_bytes(bytes)
    }
}
