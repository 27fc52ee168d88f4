// SPDX-License-Identifier: Apache-2.0
//! Self-describing TLV scalar codec and content hashing.
//!
//! Every [`Value`] round-trips through [`encode_value`]/[`decode_value`] as a
//! single type tag byte followed by a fixed or length-prefixed payload.
//! Integers are big-endian throughout, so byte order matches numeric order
//! for the unsigned uses elsewhere in factdb (EAV/AVE key ordering).

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

use std::fmt;

mod eid;
mod value;

pub use eid::Eid;
pub use value::Value;

/// Errors raised while encoding or decoding a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The decoder read a byte that is not a recognized type tag.
    #[error("[CODEC_UNKNOWN_TAG] unrecognized type tag {0:#04x}")]
    UnknownTag(u8),
    /// The buffer ended before a complete value could be read.
    #[error("[CODEC_UNEXPECTED_EOF] buffer ended mid-value")]
    UnexpectedEof,
    /// A string payload was not valid UTF-8.
    #[error("[CODEC_INVALID_UTF8] string payload was not valid UTF-8")]
    InvalidUtf8,
    /// A stored hex hash string was the wrong length or contained
    /// non-hex-digit characters.
    #[error("[CODEC_INVALID_HASH] {0:?} is not a well-formed hash")]
    InvalidHash(String),
}

/// A 32-byte BLAKE3 content hash, used to address nodes in the transaction
/// DAG and (if a blob layer is added later) arbitrary content-addressed
/// blobs.
///
/// `Display` renders lowercase hex, matching the `nodes/<hex-hash>` storage
/// layout.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// The fixed-width all-zero sentinel meaning "no parent".
    pub const NULL: Self = Self([0u8; 32]);

    /// View the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `true` for the null-hash sentinel.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Parse the lowercase-hex rendering [`Display`](fmt::Display) produces
    /// back into a hash — the inverse used when loading `refs/head`.
    ///
    /// # Errors
    /// [`CodecError::InvalidHash`] if `s` is not exactly 64 hex digits.
    pub fn parse_hex(s: &str) -> Result<Self, CodecError> {
        if s.len() != 64 {
            return Err(CodecError::InvalidHash(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = s.as_bytes()[i * 2];
            let lo = s.as_bytes()[i * 2 + 1];
            let hi = hex_nibble(hi).ok_or_else(|| CodecError::InvalidHash(s.to_string()))?;
            let lo = hex_nibble(lo).ok_or_else(|| CodecError::InvalidHash(s.to_string()))?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Compute the content hash of `bytes`.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let hash = blake3::hash(bytes);
    ContentHash(*hash.as_bytes())
}

/// Encode `value` onto the end of `out`. Every [`Value`] variant has a tag,
/// so encoding cannot fail.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    value.encode(out);
}

/// Decode one value starting at `*pos` in `buf`, advancing `*pos` past it.
///
/// # Errors
/// Returns [`CodecError::UnknownTag`] for an unrecognized tag byte and
/// [`CodecError::UnexpectedEof`] if the buffer ends before a complete
/// payload is read.
pub fn decode_value(buf: &[u8], pos: &mut usize) -> Result<Value, CodecError> {
    let mut reader = Reader { buf, pos: *pos };
    let value = Value::decode(&mut reader)?;
    *pos = reader.pos;
    Ok(value)
}

/// A cursor over a byte slice used by every `decode` implementation in this
/// crate. Centralizing the bounds checks here means every reader fails the
/// same way ([`CodecError::UnexpectedEof`]) on a short buffer.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn read_u8(&mut self) -> Result<u8, CodecError> {
        let byte = *self.buf.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let slice = self.buf.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, CodecError> {
        let bytes = self.read_exact(4)?;
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(i32::from_be_bytes(arr))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.read_exact(4)?;
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(u32::from_be_bytes(arr))
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64, CodecError> {
        let bytes = self.read_exact(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(arr))
    }

    pub(crate) fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof)?;
        let bytes = self.read_exact(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub(crate) fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof)?;
        Ok(self.read_exact(len)?.to_vec())
    }
}

pub(crate) fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let len = bytes.len() as i32;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_hash_is_all_zero() {
        assert!(ContentHash::NULL.is_null());
        assert_eq!(ContentHash::NULL.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn hash_bytes_is_deterministic() {
        let a = hash_bytes(b"hello factdb");
        let b = hash_bytes(b"hello factdb");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_display_is_lowercase_hex() {
        let h = hash_bytes(b"x");
        let s = h.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn parse_hex_round_trips_through_display() {
        let h = hash_bytes(b"round trip me");
        let parsed = ContentHash::parse_hex(&h.to_string()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn parse_hex_rejects_wrong_length() {
        let err = ContentHash::parse_hex("abcd").unwrap_err();
        assert!(matches!(err, CodecError::InvalidHash(_)));
    }

    #[test]
    fn parse_hex_rejects_non_hex_digits() {
        let s = "g".repeat(64);
        let err = ContentHash::parse_hex(&s).unwrap_err();
        assert!(matches!(err, CodecError::InvalidHash(_)));
    }

    #[test]
    fn unknown_tag_is_reported() {
        let buf = [0xFFu8];
        let mut pos = 0;
        let err = decode_value(&buf, &mut pos).unwrap_err();
        assert_eq!(err, CodecError::UnknownTag(0xFF));
    }

    #[test]
    fn truncated_buffer_is_unexpected_eof() {
        let buf = [b'i', 0x00, 0x00]; // int32 tag needs 4 payload bytes, only 2 given
        let mut pos = 0;
        let err = decode_value(&buf, &mut pos).unwrap_err();
        assert_eq!(err, CodecError::UnexpectedEof);
    }
}
