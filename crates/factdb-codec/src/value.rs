// SPDX-License-Identifier: Apache-2.0
//! The runtime value type carried by facts and node headers.

use crate::{write_len_prefixed, CodecError, Eid, Reader};

/// A scalar value a fact can hold.
///
/// This is the codec's explicit runtime type — the Rust stand-in for the
/// reflective typing the system this is modeled on derived from class
/// introspection. Every variant maps to exactly one type tag byte.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Value {
    /// Tag `B`.
    Bool(bool),
    /// Tag `b`.
    Byte(u8),
    /// Tag `i`, big-endian.
    I32(i32),
    /// Tag `l`, big-endian.
    I64(i64),
    /// Tag `s`, UTF-8 bytes length-prefixed by an `i32`.
    Str(String),
    /// Tag `a`, raw bytes length-prefixed by an `i32`.
    Bytes(Vec<u8>),
    /// Tag `t`: epoch-milliseconds instant.
    Instant(i64),
    /// Tag `z`: zoned timestamp (epoch-seconds, nanos, IANA zone id).
    ZonedTimestamp {
        /// Seconds since the Unix epoch.
        epoch_seconds: i64,
        /// Sub-second nanoseconds, `0..1_000_000_000`.
        nanos: i32,
        /// IANA zone id, e.g. `"America/Chicago"`.
        zone_id: String,
    },
    /// Tag `e`: an entity reference.
    Eid(Eid),
}

const TAG_BOOL: u8 = b'B';
const TAG_BYTE: u8 = b'b';
const TAG_I32: u8 = b'i';
const TAG_I64: u8 = b'l';
const TAG_STR: u8 = b's';
const TAG_BYTES: u8 = b'a';
const TAG_INSTANT: u8 = b't';
const TAG_ZONED: u8 = b'z';
const TAG_EID: u8 = b'e';

impl Value {
    /// The single tag byte this value encodes as.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Bool(_) => TAG_BOOL,
            Self::Byte(_) => TAG_BYTE,
            Self::I32(_) => TAG_I32,
            Self::I64(_) => TAG_I64,
            Self::Str(_) => TAG_STR,
            Self::Bytes(_) => TAG_BYTES,
            Self::Instant(_) => TAG_INSTANT,
            Self::ZonedTimestamp { .. } => TAG_ZONED,
            Self::Eid(_) => TAG_EID,
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.tag());
        match self {
            Self::Bool(b) => out.push(u8::from(*b)),
            Self::Byte(b) => out.push(*b),
            Self::I32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::I64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Str(s) => write_len_prefixed(out, s.as_bytes()),
            Self::Bytes(b) => write_len_prefixed(out, b),
            Self::Instant(millis) => out.extend_from_slice(&millis.to_be_bytes()),
            Self::ZonedTimestamp {
                epoch_seconds,
                nanos,
                zone_id,
            } => {
                out.extend_from_slice(&epoch_seconds.to_be_bytes());
                out.extend_from_slice(&nanos.to_be_bytes());
                write_len_prefixed(out, zone_id.as_bytes());
            }
            Self::Eid(eid) => {
                out.extend_from_slice(&eid.iid.to_be_bytes());
                out.extend_from_slice(&eid.local.to_be_bytes());
            }
        }
    }

    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let tag = reader.read_u8()?;
        match tag {
            TAG_BOOL => Ok(Self::Bool(reader.read_u8()? != 0)),
            TAG_BYTE => Ok(Self::Byte(reader.read_u8()?)),
            TAG_I32 => Ok(Self::I32(reader.read_i32()?)),
            TAG_I64 => Ok(Self::I64(reader.read_i64()?)),
            TAG_STR => Ok(Self::Str(reader.read_string()?)),
            TAG_BYTES => Ok(Self::Bytes(reader.read_bytes()?)),
            TAG_INSTANT => Ok(Self::Instant(reader.read_i64()?)),
            TAG_ZONED => {
                let epoch_seconds = reader.read_i64()?;
                let nanos = reader.read_i32()?;
                let zone_id = reader.read_string()?;
                Ok(Self::ZonedTimestamp {
                    epoch_seconds,
                    nanos,
                    zone_id,
                })
            }
            TAG_EID => {
                let iid = reader.read_u32()?;
                let local_bytes = reader.read_i64()?;
                #[allow(clippy::cast_sign_loss)]
                let local = local_bytes as u64;
                Ok(Self::Eid(Eid::new(iid, local)))
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}
