//! Packed key sets for multi-entry indexes.
//!
//! A multi-entry index stores one physical cell per record, but logically
//! contributes one entry per distinct element of the record's array key.
//! This module packs that element set into a single value:
//!
//! ```text
//! [0x06][u32 len][element encoding][u32 len][element encoding]...
//! ```
//!
//! Elements are stored deduplicated and in sorted encoded order, so the
//! number of frames is the record's logical entry count and membership can
//! be tested frame-by-frame against an encoded candidate without decoding.
//!
//! The engine's range compiler also uses the raw element encoding as a
//! coarse substring prefilter against the packed cell; that prefilter can
//! overmatch (an element's bytes may straddle frame boundaries), which is
//! why [`contains_encoded`] — the frame-exact test — is authoritative.

use crate::error::{CoreError, CoreResult};
use crate::types::Key;

/// Tag byte introducing a packed key set.
pub const SET_TAG: u8 = 0x06;

/// Encode the distinct element set of a key under multi-entry semantics.
///
/// An array key packs its distinct elements; any other key packs as a
/// single-element set.
///
/// # Errors
///
/// Returns [`CoreError::InvalidKey`] if any element is unencodable.
///
/// # Example
///
/// ```
/// use cairn_core::encoding::composite::{element_count, encode_key_set};
/// use cairn_core::Key;
///
/// let key = Key::Array(vec![Key::Number(1.0), Key::Number(2.0), Key::Number(2.0)]);
/// let set = encode_key_set(&key).unwrap();
/// assert_eq!(element_count(&set).unwrap(), 2);
/// ```
pub fn encode_key_set(key: &Key) -> CoreResult<Vec<u8>> {
    let mut encoded: Vec<Vec<u8>> = match key {
        Key::Array(items) => items.iter().map(Key::encode).collect::<CoreResult<_>>()?,
        other => vec![other.encode()?],
    };
    encoded.sort();
    encoded.dedup();

    let total: usize = encoded.iter().map(|e| 4 + e.len()).sum();
    let mut buf = Vec::with_capacity(1 + total);
    buf.push(SET_TAG);
    for element in &encoded {
        let len = u32::try_from(element.len())
            .map_err(|_| CoreError::encoding("key element too large for set frame"))?;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(element);
    }
    Ok(buf)
}

/// Decode a packed key set into its distinct elements, in sorted key order.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the bytes are malformed.
pub fn decode_key_set(set: &[u8]) -> CoreResult<Vec<Key>> {
    let mut elements = Vec::new();
    for frame in frames(set)? {
        elements.push(Key::decode(frame?)?);
    }
    Ok(elements)
}

/// Test whether a packed key set contains an encoded element.
///
/// This is the exact membership check: it compares whole frames, so element
/// encodings that merely appear as substrings of the packed bytes do not
/// match.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the set bytes are malformed.
pub fn contains_encoded(set: &[u8], encoded_element: &[u8]) -> CoreResult<bool> {
    for frame in frames(set)? {
        let frame = frame?;
        // Frames are sorted; stop once we have passed the candidate.
        match frame.cmp(encoded_element) {
            std::cmp::Ordering::Less => {}
            std::cmp::Ordering::Equal => return Ok(true),
            std::cmp::Ordering::Greater => return Ok(false),
        }
    }
    Ok(false)
}

/// The number of distinct elements in a packed key set.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the set bytes are malformed.
pub fn element_count(set: &[u8]) -> CoreResult<usize> {
    let mut count = 0;
    for frame in frames(set)? {
        frame?;
        count += 1;
    }
    Ok(count)
}

/// Iterate the raw element frames of a packed key set.
fn frames(set: &[u8]) -> CoreResult<FrameIter<'_>> {
    match set.split_first() {
        Some((&SET_TAG, rest)) => Ok(FrameIter { rest }),
        Some((other, _)) => {
            Err(CoreError::encoding(format!("expected key set tag, found {other:#x}")))
        }
        None => Err(CoreError::encoding("empty key set")),
    }
}

struct FrameIter<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for FrameIter<'a> {
    type Item = CoreResult<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let Some(len_bytes) = self.rest.get(..4) else {
            self.rest = &[];
            return Some(Err(CoreError::encoding("truncated key set frame header")));
        };
        let mut header = [0u8; 4];
        header.copy_from_slice(len_bytes);
        let len = u32::from_be_bytes(header) as usize;
        let Some(frame) = self.rest.get(4..4 + len) else {
            self.rest = &[];
            return Some(Err(CoreError::encoding("truncated key set frame")));
        };
        self.rest = &self.rest[4 + len..];
        Some(Ok(frame))
    }
}
