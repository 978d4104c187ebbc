//! BER definite-length decoding.
//!
//! Short form for lengths below 0x80, long form `0x80 | k` followed by k
//! big-endian octets otherwise. The indefinite form (0x80) is not used by
//! SNMP and is rejected. The encode direction lives on
//! [`EncodeBuf::push_length`](super::EncodeBuf::push_length).

use crate::error::{DecodeErrorKind, Error, Result};

/// Maximum number of long-form length octets accepted (4 covers u32 lengths).
pub const MAX_LENGTH_OCTETS: usize = 4;

/// Number of octets the encoded form of `len` occupies.
pub fn encoded_length_size(len: usize) -> usize {
    if len < 0x80 {
        1
    } else {
        1 + (32 - (len as u32).leading_zeros()).div_ceil(8) as usize
    }
}

/// Decode a length at `buf[0..]`.
///
/// Returns `(length, octets_consumed)`. Rejects the indefinite form,
/// over-long length fields, and truncated input.
pub fn decode_length(buf: &[u8], offset: usize) -> Result<(usize, usize)> {
    let first = *buf
        .first()
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::TruncatedData))?;

    if first < 0x80 {
        return Ok((first as usize, 1));
    }
    if first == 0x80 {
        return Err(Error::decode(offset, DecodeErrorKind::IndefiniteLength));
    }

    let octets = (first & 0x7F) as usize;
    if octets > MAX_LENGTH_OCTETS {
        return Err(Error::decode(offset, DecodeErrorKind::LengthTooLong { octets }));
    }
    if buf.len() < 1 + octets {
        return Err(Error::decode(offset, DecodeErrorKind::TruncatedData));
    }

    let mut len: usize = 0;
    for &b in &buf[1..1 + octets] {
        len = (len << 8) | b as usize;
    }
    Ok((len, 1 + octets))
}
