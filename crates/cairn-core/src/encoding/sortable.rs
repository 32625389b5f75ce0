//! Sort-order preserving encoding for index keys.
//!
//! This module encodes [`Key`] values into bytes that compare the way the
//! logical keys do. Key design choices:
//!
//! ## Category tags
//!
//! Categories are tagged in their sort order (number `0x01`, date `0x02`,
//! binary `0x03`, string `0x04`, array `0x05`), so cross-category order falls
//! out of the first byte.
//!
//! ## Number encoding
//!
//! Numbers use IEEE 754 bit transformations: positive values (and +0) flip
//! the sign bit, negative values flip all bits. The result, compared as
//! big-endian bytes, reproduces numeric order including infinities.
//! Negative zero is canonicalized to +0 so the two are one key. `NaN` is
//! rejected; it has no place in a total key order.
//!
//! ## Date encoding
//!
//! Dates are signed millisecond timestamps with the sign bit flipped, so
//! pre-epoch instants sort before post-epoch ones.
//!
//! ## Binary and string encoding
//!
//! Variable-length payloads are `0x00`-escaped (`0x00` becomes `0x00 0x01`)
//! and terminated by `0x00 0x00`, which preserves bytewise order and keeps
//! `"a" < "aa" < "ab" < "b"`.
//!
//! ## Array encoding
//!
//! Arrays concatenate the full encodings of their elements and close with a
//! `0x00` terminator. The terminator is lower than every category tag, so an
//! array sorts before any array it is a proper prefix of, and two arrays
//! otherwise compare by their first differing element. Because each element
//! carries its own tag and framing, a prefix relationship can never produce
//! a false equality.

use crate::error::{CoreError, CoreResult};
use crate::types::Key;

/// Type tags for the sortable encoding, in category sort order.
pub mod tags {
    /// Numbers sort first.
    pub const NUMBER: u8 = 0x01;
    /// Dates (instants).
    pub const DATE: u8 = 0x02;
    /// Binary blobs.
    pub const BINARY: u8 = 0x03;
    /// UTF-8 strings.
    pub const STRING: u8 = 0x04;
    /// Arrays sort last.
    pub const ARRAY: u8 = 0x05;
}

/// Terminates an array encoding; lower than every tag.
const ARRAY_TERMINATOR: u8 = 0x00;

/// Constant for flipping the sign bit of 64-bit values.
const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

/// Escape byte: a literal 0x00 in payload data becomes 0x00 0x01.
const ESCAPE_BYTE: u8 = 0x01;
/// Payload terminator marker: 0x00 0x00.
const TERMINATOR: u8 = 0x00;

/// Encode a key into its order-preserving byte representation.
///
/// # Errors
///
/// Returns [`CoreError::InvalidKey`] if the key contains `NaN`.
///
/// # Example
///
/// ```
/// use cairn_core::encoding::sortable::encode_key;
/// use cairn_core::Key;
///
/// let neg = encode_key(&Key::Number(-5.0)).unwrap();
/// let pos = encode_key(&Key::Number(5.0)).unwrap();
/// assert!(neg < pos);
/// ```
pub fn encode_key(key: &Key) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(encoded_size_hint(key));
    encode_into(key, &mut buf)?;
    Ok(buf)
}

fn encode_into(key: &Key, buf: &mut Vec<u8>) -> CoreResult<()> {
    match key {
        Key::Number(n) => {
            if n.is_nan() {
                return Err(CoreError::invalid_key("NaN is not a valid key"));
            }
            buf.push(tags::NUMBER);
            // -0.0 and +0.0 are one key; canonicalize before taking bits.
            let n = if *n == 0.0 { 0.0 } else { *n };
            let bits = n.to_bits();
            let encoded = if bits & SIGN_BIT == 0 { bits ^ SIGN_BIT } else { !bits };
            buf.extend_from_slice(&encoded.to_be_bytes());
        }
        Key::Date(ms) => {
            buf.push(tags::DATE);
            let encoded = (*ms as u64) ^ SIGN_BIT;
            buf.extend_from_slice(&encoded.to_be_bytes());
        }
        Key::Binary(bytes) => {
            buf.push(tags::BINARY);
            encode_bytes_escaped(bytes, buf);
        }
        Key::String(s) => {
            buf.push(tags::STRING);
            encode_bytes_escaped(s.as_bytes(), buf);
        }
        Key::Array(items) => {
            buf.push(tags::ARRAY);
            for item in items {
                encode_into(item, buf)?;
            }
            buf.push(ARRAY_TERMINATOR);
        }
    }
    Ok(())
}

/// Decode a key from its order-preserving byte representation.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the bytes are malformed or carry
/// trailing garbage.
pub fn decode_key(bytes: &[u8]) -> CoreResult<Key> {
    let (key, consumed) = decode_key_with_len(bytes)?;
    if consumed != bytes.len() {
        return Err(CoreError::encoding("trailing bytes after encoded key"));
    }
    Ok(key)
}

/// Decode a key and return the number of input bytes consumed.
///
/// This is the entry point the array and key-set decoders use when an
/// encoded key is embedded in a larger value.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the bytes are malformed.
pub fn decode_key_with_len(bytes: &[u8]) -> CoreResult<(Key, usize)> {
    let Some((&tag, rest)) = bytes.split_first() else {
        return Err(CoreError::encoding("unexpected end of input in key decode"));
    };

    match tag {
        tags::NUMBER => {
            let encoded = read_u64(rest, "number")?;
            let bits = if encoded & SIGN_BIT != 0 { encoded ^ SIGN_BIT } else { !encoded };
            let n = f64::from_bits(bits);
            if n.is_nan() {
                return Err(CoreError::encoding("encoded number decodes to NaN"));
            }
            Ok((Key::Number(n), 9))
        }
        tags::DATE => {
            let encoded = read_u64(rest, "date")?;
            Ok((Key::Date((encoded ^ SIGN_BIT) as i64), 9))
        }
        tags::BINARY => {
            let (payload, consumed) = decode_bytes_escaped(rest)?;
            Ok((Key::Binary(payload), 1 + consumed))
        }
        tags::STRING => {
            let (payload, consumed) = decode_bytes_escaped(rest)?;
            let s = String::from_utf8(payload)
                .map_err(|e| CoreError::encoding(format!("invalid UTF-8 in string key: {e}")))?;
            Ok((Key::String(s), 1 + consumed))
        }
        tags::ARRAY => {
            let mut items = Vec::new();
            let mut offset = 0;
            loop {
                match rest.get(offset) {
                    None => {
                        return Err(CoreError::encoding("unterminated array key"));
                    }
                    Some(&ARRAY_TERMINATOR) => {
                        return Ok((Key::Array(items), 1 + offset + 1));
                    }
                    Some(_) => {
                        let (item, consumed) = decode_key_with_len(&rest[offset..])?;
                        items.push(item);
                        offset += consumed;
                    }
                }
            }
        }
        other => Err(CoreError::encoding(format!("unknown key type tag: {other:#x}"))),
    }
}

/// Estimate the encoded size of a key, for buffer pre-allocation.
///
/// Strings and binary payloads may expand beyond the hint when they contain
/// zero bytes that need escaping.
#[must_use]
pub fn encoded_size_hint(key: &Key) -> usize {
    match key {
        Key::Number(_) | Key::Date(_) => 9,
        // tag + payload + terminator
        Key::Binary(b) => 1 + b.len() + 2,
        Key::String(s) => 1 + s.len() + 2,
        Key::Array(items) => 2 + items.iter().map(encoded_size_hint).sum::<usize>(),
    }
}

fn read_u64(bytes: &[u8], what: &str) -> CoreResult<u64> {
    let slice = bytes
        .get(..8)
        .ok_or_else(|| CoreError::encoding(format!("unexpected end of input reading {what}")))?;
    let array: [u8; 8] = slice
        .try_into()
        .map_err(|_| CoreError::encoding(format!("failed to read {what} bytes")))?;
    Ok(u64::from_be_bytes(array))
}

/// Encode bytes with zero-escape framing.
///
/// Each 0x00 in the input becomes 0x00 0x01; the payload ends with 0x00 0x00.
fn encode_bytes_escaped(data: &[u8], buf: &mut Vec<u8>) {
    for &byte in data {
        if byte == 0x00 {
            buf.push(0x00);
            buf.push(ESCAPE_BYTE);
        } else {
            buf.push(byte);
        }
    }
    buf.push(TERMINATOR);
    buf.push(TERMINATOR);
}

/// Decode zero-escaped bytes; returns the payload and bytes consumed.
fn decode_bytes_escaped(data: &[u8]) -> CoreResult<(Vec<u8>, usize)> {
    let mut payload = Vec::new();
    let mut i = 0;

    while i < data.len() {
        if data[i] == 0x00 {
            match data.get(i + 1) {
                Some(&TERMINATOR) => return Ok((payload, i + 2)),
                Some(&ESCAPE_BYTE) => {
                    payload.push(0x00);
                    i += 2;
                }
                Some(other) => {
                    return Err(CoreError::encoding(format!(
                        "invalid escape sequence: 0x00 0x{other:02x}"
                    )));
                }
                None => return Err(CoreError::encoding("unexpected end of escaped bytes")),
            }
        } else {
            payload.push(data[i]);
            i += 1;
        }
    }

    Err(CoreError::encoding("missing terminator in escaped bytes"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn enc(key: &Key) -> Vec<u8> {
        encode_key(key).unwrap()
    }

    // ========================================================================
    // Round-trip tests
    // ========================================================================

    #[test]
    fn roundtrip_numbers() {
        for n in [f64::NEG_INFINITY, -1.0e300, -1.0, -0.0, 0.0, 0.5, 1.0, 1.0e300, f64::INFINITY] {
            let key = Key::Number(n);
            assert_eq!(decode_key(&enc(&key)).unwrap(), key, "failed for {n}");
        }
    }

    #[test]
    fn roundtrip_dates() {
        for ms in [i64::MIN, -86_400_000, -1, 0, 1, 1_700_000_000_000, i64::MAX] {
            let key = Key::Date(ms);
            assert_eq!(decode_key(&enc(&key)).unwrap(), key, "failed for {ms}");
        }
    }

    #[test]
    fn roundtrip_strings() {
        for s in ["", "a", "hello world", "日本語", "\u{1F600}", "nul\u{0}embedded"] {
            let key = Key::String(s.to_owned());
            assert_eq!(decode_key(&enc(&key)).unwrap(), key, "failed for {s:?}");
        }
    }

    #[test]
    fn roundtrip_binary() {
        for b in [vec![], vec![0u8], vec![0, 0, 0], vec![255, 0, 128], vec![1, 2, 3]] {
            let key = Key::Binary(b.clone());
            assert_eq!(decode_key(&enc(&key)).unwrap(), key, "failed for {b:?}");
        }
    }

    #[test]
    fn roundtrip_arrays() {
        let keys = [
            Key::Array(vec![]),
            Key::Array(vec![Key::Number(1.0)]),
            Key::Array(vec![Key::String("x".into()), Key::Date(5)]),
            Key::Array(vec![Key::Array(vec![Key::Binary(vec![0])]), Key::Number(-2.0)]),
        ];
        for key in keys {
            assert_eq!(decode_key(&enc(&key)).unwrap(), key, "failed for {key:?}");
        }
    }

    // ========================================================================
    // Sort order tests
    // ========================================================================

    #[test]
    fn sort_order_categories() {
        let keys = [
            Key::Number(f64::INFINITY),
            Key::Date(i64::MIN),
            Key::Binary(vec![]),
            Key::String(String::new()),
            Key::Array(vec![]),
        ];
        for pair in keys.windows(2) {
            assert!(enc(&pair[0]) < enc(&pair[1]), "{:?} should encode below {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn sort_order_numbers() {
        let values =
            [f64::NEG_INFINITY, -1.0e10, -2.0, -1.0, -0.5, -0.0, 0.0, 0.5, 1.0, 2.0, f64::INFINITY];
        for pair in values.windows(2) {
            let a = enc(&Key::Number(pair[0]));
            let b = enc(&Key::Number(pair[1]));
            assert!(a <= b, "{} should encode at or below {}", pair[0], pair[1]);
        }
        // -0.0 canonicalizes: both zeros share one encoding.
        assert_eq!(enc(&Key::Number(-0.0)), enc(&Key::Number(0.0)));
    }

    #[test]
    fn sort_order_dates() {
        let values = [i64::MIN, -1, 0, 1, i64::MAX];
        for pair in values.windows(2) {
            assert!(enc(&Key::Date(pair[0])) < enc(&Key::Date(pair[1])));
        }
    }

    #[test]
    fn sort_order_strings() {
        let values = ["", "a", "aa", "ab", "b", "ba"];
        for pair in values.windows(2) {
            let a = enc(&Key::String(pair[0].into()));
            let b = enc(&Key::String(pair[1].into()));
            assert!(a < b, "{:?} should encode below {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn sort_order_binary_with_zeros() {
        let values = [vec![], vec![0], vec![0, 0], vec![0, 1], vec![1], vec![1, 0]];
        for pair in values.windows(2) {
            let a = enc(&Key::Binary(pair[0].clone()));
            let b = enc(&Key::Binary(pair[1].clone()));
            assert!(a < b, "{:?} should encode below {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn sort_order_arrays() {
        let values = [
            Key::Array(vec![]),
            Key::Array(vec![Key::Number(1.0)]),
            Key::Array(vec![Key::Number(1.0), Key::Number(0.0)]),
            Key::Array(vec![Key::Number(2.0)]),
            Key::Array(vec![Key::String("a".into())]),
        ];
        for pair in values.windows(2) {
            assert!(enc(&pair[0]) < enc(&pair[1]), "{:?} should encode below {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn array_prefix_is_not_equal() {
        // ["a"] must not compare equal to ["a", ...] under byte comparison.
        let short = enc(&Key::Array(vec![Key::String("a".into())]));
        let long = enc(&Key::Array(vec![Key::String("a".into()), Key::String("b".into())]));
        assert!(short < long);
        assert_ne!(short, long[..short.len()].to_vec());
    }

    // ========================================================================
    // Error handling tests
    // ========================================================================

    #[test]
    fn encode_rejects_nan() {
        assert!(matches!(encode_key(&Key::Number(f64::NAN)), Err(CoreError::InvalidKey(_))));
        assert!(matches!(
            encode_key(&Key::Array(vec![Key::Number(f64::NAN)])),
            Err(CoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn decode_empty_fails() {
        assert!(decode_key(&[]).is_err());
    }

    #[test]
    fn decode_truncated_number_fails() {
        assert!(decode_key(&[tags::NUMBER, 0, 0]).is_err());
    }

    #[test]
    fn decode_unterminated_string_fails() {
        assert!(decode_key(&[tags::STRING, b'h', b'i']).is_err());
    }

    #[test]
    fn decode_unterminated_array_fails() {
        let mut bytes = vec![tags::ARRAY];
        bytes.extend_from_slice(&enc(&Key::Number(1.0)));
        // No terminator.
        assert!(decode_key(&bytes).is_err());
    }

    #[test]
    fn decode_unknown_tag_fails() {
        assert!(decode_key(&[0xFE]).is_err());
    }

    #[test]
    fn decode_trailing_garbage_fails() {
        let mut bytes = enc(&Key::Number(1.0));
        bytes.push(0xAA);
        assert!(decode_key(&bytes).is_err());
    }

    #[test]
    fn size_hint_is_exact_without_escapes() {
        let key = Key::Array(vec![Key::Number(1.0), Key::String("abc".into())]);
        assert_eq!(encoded_size_hint(&key), enc(&key).len());
    }
}
