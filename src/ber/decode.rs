//! BER decoding.
//!
//! [`Decoder`] walks a `Bytes` buffer and hands out typed primitives.
//! Constructed types yield sub-decoders over their content, so the caller
//! can detect trailing garbage by checking the sub-decoder drained.
//!
//! Parsing is strict where the protocol depends on it: integers must be in
//! minimal form, OID arc packing must honor the 40*a+b rule, and every
//! length is bounded by the remaining input.

use bytes::Bytes;
use smallvec::SmallVec;

use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::{INLINE_ARCS, MAX_OID_LEN, Oid};

/// BER decoder over a byte buffer.
pub struct Decoder {
    data: Bytes,
    /// Absolute offset of `data[0]` in the original datagram, for errors.
    base: usize,
    pos: usize,
}

impl Decoder {
    /// Create a decoder over a buffer.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            base: 0,
            pos: 0,
        }
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::decode(self.offset(), DecodeErrorKind::TruncatedData))
    }

    /// Read one TLV, returning its tag and content octets.
    pub fn read_tlv(&mut self) -> Result<(u8, Bytes)> {
        let tag = self.peek_tag()?;
        let len_offset = self.offset() + 1;
        let (len, len_octets) =
            super::length::decode_length(&self.data[self.pos + 1..], len_offset)?;

        let content_start = self.pos + 1 + len_octets;
        if len > self.data.len() - content_start {
            return Err(Error::decode(
                len_offset,
                DecodeErrorKind::LengthExceedsMax {
                    length: len,
                    max: self.data.len() - content_start,
                },
            ));
        }

        let content = self.data.slice(content_start..content_start + len);
        self.pos = content_start + len;
        Ok((tag, content))
    }

    /// Read a TLV and require a specific tag.
    pub fn expect(&mut self, expected: u8) -> Result<Bytes> {
        let offset = self.offset();
        let (actual, content) = self.read_tlv()?;
        if actual != expected {
            return Err(Error::decode(
                offset,
                DecodeErrorKind::UnexpectedTag { expected, actual },
            ));
        }
        Ok(content)
    }

    /// Read a constructed TLV with the given tag, returning a sub-decoder
    /// over its content.
    pub fn read_constructed(&mut self, expected: u8) -> Result<Decoder> {
        let content = self.expect(expected)?;
        // Content ends where the parent cursor now stands.
        let content_base = self.base + self.pos - content.len();
        Ok(Decoder {
            data: content,
            base: content_base,
            pos: 0,
        })
    }

    /// Read a SEQUENCE, returning a sub-decoder over its content.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read an INTEGER as i32. Rejects empty, oversized, and non-minimal
    /// encodings.
    pub fn read_integer(&mut self) -> Result<i32> {
        let offset = self.offset();
        let content = self.expect(tag::universal::INTEGER)?;
        decode_signed(&content, offset)
    }

    /// Read an unsigned 32-bit value under an application tag
    /// (Counter32, Gauge32, TimeTicks).
    pub fn read_unsigned32(&mut self, expected: u8) -> Result<u32> {
        let offset = self.offset();
        let content = self.expect(expected)?;
        decode_unsigned32(&content, offset)
    }

    /// Read a Counter64.
    pub fn read_integer64(&mut self) -> Result<u64> {
        let offset = self.offset();
        let content = self.expect(tag::application::COUNTER64)?;
        decode_unsigned64(&content, offset)
    }

    /// Read an OCTET STRING. The constructed form (0x24) is rejected.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        let offset = self.offset();
        let actual = self.peek_tag()?;
        if actual == tag::universal::OCTET_STRING_CONSTRUCTED {
            return Err(Error::decode(
                offset,
                DecodeErrorKind::ConstructedOctetString,
            ));
        }
        self.expect(tag::universal::OCTET_STRING)
    }

    /// Read an OCTET STRING and return a sub-decoder over its content.
    ///
    /// Used for wrapped structures like msgSecurityParameters, where an
    /// octet string carries a nested BER encoding.
    pub fn read_octet_string_decoder(&mut self) -> Result<Decoder> {
        let content = self.read_octet_string()?;
        let content_base = self.base + self.pos - content.len();
        Ok(Decoder {
            data: content,
            base: content_base,
            pos: 0,
        })
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let offset = self.offset();
        let content = self.expect(tag::universal::NULL)?;
        if !content.is_empty() {
            return Err(Error::decode(offset, DecodeErrorKind::InvalidNull));
        }
        Ok(())
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let offset = self.offset();
        let content = self.expect(tag::universal::OBJECT_IDENTIFIER)?;
        decode_oid(&content, offset)
    }

    /// Read an IP address (application tag 0x40, exactly 4 octets).
    pub fn read_ip_address(&mut self) -> Result<[u8; 4]> {
        let offset = self.offset();
        let content = self.expect(tag::application::IP_ADDRESS)?;
        if content.len() != 4 {
            return Err(Error::decode(
                offset,
                DecodeErrorKind::InvalidIpAddressLength {
                    length: content.len(),
                },
            ));
        }
        Ok([content[0], content[1], content[2], content[3]])
    }
}

/// Decode two's-complement signed content octets as i32, minimal form only.
pub(crate) fn decode_signed(content: &[u8], offset: usize) -> Result<i32> {
    if content.is_empty() {
        return Err(Error::decode(offset, DecodeErrorKind::ZeroLengthInteger));
    }
    if content.len() > 4 {
        return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
    }
    if content.len() > 1 {
        let redundant_zero = content[0] == 0x00 && content[1] & 0x80 == 0;
        let redundant_ff = content[0] == 0xFF && content[1] & 0x80 != 0;
        if redundant_zero || redundant_ff {
            return Err(Error::decode(offset, DecodeErrorKind::NonMinimalInteger));
        }
    }

    let mut value: i32 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in content {
        value = (value << 8) | b as i32;
    }
    Ok(value)
}

/// Decode unsigned content octets as u32.
///
/// A leading 0x00 is only valid to clear a set top bit; a 4-octet encoding
/// with the top bit set is accepted as a large unsigned value (net-snmp
/// emits this form).
pub(crate) fn decode_unsigned32(content: &[u8], offset: usize) -> Result<u32> {
    if content.is_empty() {
        return Err(Error::decode(offset, DecodeErrorKind::ZeroLengthInteger));
    }
    let octets = if content[0] == 0x00 && content.len() > 1 {
        if content[1] & 0x80 == 0 {
            return Err(Error::decode(offset, DecodeErrorKind::NonMinimalInteger));
        }
        &content[1..]
    } else {
        content
    };
    if octets.len() > 4 {
        return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
    }

    let mut value: u32 = 0;
    for &b in octets {
        value = (value << 8) | b as u32;
    }
    Ok(value)
}

/// Decode unsigned content octets as u64 (Counter64).
pub(crate) fn decode_unsigned64(content: &[u8], offset: usize) -> Result<u64> {
    if content.is_empty() {
        return Err(Error::decode(offset, DecodeErrorKind::ZeroLengthInteger));
    }
    let octets = if content[0] == 0x00 && content.len() > 1 {
        if content[1] & 0x80 == 0 {
            return Err(Error::decode(offset, DecodeErrorKind::NonMinimalInteger));
        }
        &content[1..]
    } else {
        content
    };
    if octets.len() > 8 {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::Integer64TooLong {
                length: content.len(),
            },
        ));
    }

    let mut value: u64 = 0;
    for &b in octets {
        value = (value << 8) | b as u64;
    }
    Ok(value)
}

/// Decode OID content octets.
pub(crate) fn decode_oid(content: &[u8], offset: usize) -> Result<Oid> {
    if content.is_empty() {
        return Err(Error::decode(offset, DecodeErrorKind::InvalidOidEncoding));
    }

    // First octet packs the first two arcs as 40*a + b.
    let head = content[0];
    if head & 0x80 != 0 {
        // Multi-octet first subidentifier: arcs beyond 2.47 territory.
        // Decode it fully, then unpack.
        return decode_oid_long_head(content, offset);
    }

    let mut arcs: SmallVec<[u32; INLINE_ARCS]> = SmallVec::new();
    let (a, b) = split_head(head as u32);
    arcs.push(a);
    arcs.push(b);

    let mut arc: u32 = 0;
    let mut in_arc = false;
    for (i, &byte) in content[1..].iter().enumerate() {
        if !in_arc && byte == 0x80 {
            // Leading continuation zero: non-minimal arc encoding
            return Err(Error::decode(
                offset + 1 + i,
                DecodeErrorKind::InvalidOidEncoding,
            ));
        }
        if arc > u32::MAX >> 7 {
            return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
        }
        arc = (arc << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 != 0 {
            in_arc = true;
        } else {
            if arcs.len() >= MAX_OID_LEN {
                return Err(Error::decode(
                    offset,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len() + 1,
                        max: MAX_OID_LEN,
                    },
                ));
            }
            arcs.push(arc);
            arc = 0;
            in_arc = false;
        }
    }
    if in_arc {
        // Dangling continuation bit
        return Err(Error::decode(offset, DecodeErrorKind::InvalidOidEncoding));
    }

    Ok(Oid::try_from_arcs(arcs).map_err(|_| {
        Error::decode(
            offset,
            DecodeErrorKind::OidTooLong {
                count: MAX_OID_LEN + 1,
                max: MAX_OID_LEN,
            },
        )
    })?)
}

// First subidentifier spans multiple base-128 octets (first arc must be 2).
fn decode_oid_long_head(content: &[u8], offset: usize) -> Result<Oid> {
    let mut arcs: SmallVec<[u32; INLINE_ARCS]> = SmallVec::new();
    let mut arc: u32 = 0;
    let mut in_arc = false;
    let mut first_done = false;

    for &byte in content {
        if !in_arc && byte == 0x80 {
            return Err(Error::decode(offset, DecodeErrorKind::InvalidOidEncoding));
        }
        if arc > u32::MAX >> 7 {
            return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
        }
        arc = (arc << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 != 0 {
            in_arc = true;
        } else {
            if !first_done {
                let (a, b) = split_head(arc);
                arcs.push(a);
                arcs.push(b);
                first_done = true;
            } else {
                if arcs.len() >= MAX_OID_LEN {
                    return Err(Error::decode(
                        offset,
                        DecodeErrorKind::OidTooLong {
                            count: arcs.len() + 1,
                            max: MAX_OID_LEN,
                        },
                    ));
                }
                arcs.push(arc);
            }
            arc = 0;
            in_arc = false;
        }
    }
    if in_arc {
        return Err(Error::decode(offset, DecodeErrorKind::InvalidOidEncoding));
    }

    Ok(Oid::try_from_arcs(arcs).expect("bounded above"))
}

// Unpack the 40*a + b head octet per X.690: a is capped at 2, and b
// absorbs the rest when a == 2.
fn split_head(packed: u32) -> (u32, u32) {
    if packed < 40 {
        (0, packed)
    } else if packed < 80 {
        (1, packed - 40)
    } else {
        (2, packed - 80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn decoder(bytes: &[u8]) -> Decoder {
        Decoder::new(Bytes::copy_from_slice(bytes))
    }

    #[test]
    fn test_read_integer() {
        assert_eq!(decoder(&[0x02, 0x01, 0x2A]).read_integer().unwrap(), 42);
        assert_eq!(decoder(&[0x02, 0x01, 0xFF]).read_integer().unwrap(), -1);
        assert_eq!(
            decoder(&[0x02, 0x02, 0x00, 0x80]).read_integer().unwrap(),
            128
        );
        assert_eq!(
            decoder(&[0x02, 0x04, 0x7F, 0xFF, 0xFF, 0xFF])
                .read_integer()
                .unwrap(),
            i32::MAX
        );
    }

    #[test]
    fn test_read_integer_rejects_non_minimal() {
        // 0x00 0x2A could be 0x2A alone
        assert!(decoder(&[0x02, 0x02, 0x00, 0x2A]).read_integer().is_err());
        // 0xFF 0xFF could be 0xFF alone
        assert!(decoder(&[0x02, 0x02, 0xFF, 0xFF]).read_integer().is_err());
        // empty
        assert!(decoder(&[0x02, 0x00]).read_integer().is_err());
        // five octets overflow i32
        assert!(
            decoder(&[0x02, 0x05, 0x01, 0, 0, 0, 0])
                .read_integer()
                .is_err()
        );
    }

    #[test]
    fn test_read_unsigned32() {
        let tag = tag::application::COUNTER32;
        assert_eq!(
            decoder(&[tag, 0x01, 0x00]).read_unsigned32(tag).unwrap(),
            0
        );
        assert_eq!(
            decoder(&[tag, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF])
                .read_unsigned32(tag)
                .unwrap(),
            u32::MAX
        );
        // 4-octet top-bit-set form accepted as unsigned
        assert_eq!(
            decoder(&[tag, 0x04, 0xFF, 0xFF, 0xFF, 0xFF])
                .read_unsigned32(tag)
                .unwrap(),
            u32::MAX
        );
        // redundant leading zero rejected
        assert!(
            decoder(&[tag, 0x02, 0x00, 0x2A])
                .read_unsigned32(tag)
                .is_err()
        );
    }

    #[test]
    fn test_read_integer64() {
        assert_eq!(
            decoder(&[0x46, 0x09, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])
                .read_integer64()
                .unwrap(),
            u64::MAX
        );
        assert_eq!(decoder(&[0x46, 0x01, 0x01]).read_integer64().unwrap(), 1);
    }

    #[test]
    fn test_read_octet_string() {
        let content = decoder(&[0x04, 0x03, b'a', b'b', b'c'])
            .read_octet_string()
            .unwrap();
        assert_eq!(&content[..], b"abc");

        // Constructed form rejected
        assert!(decoder(&[0x24, 0x00]).read_octet_string().is_err());
    }

    #[test]
    fn test_read_null() {
        assert!(decoder(&[0x05, 0x00]).read_null().is_ok());
        assert!(decoder(&[0x05, 0x01, 0x00]).read_null().is_err());
    }

    #[test]
    fn test_read_oid() {
        let oid = decoder(&[0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00])
            .read_oid()
            .unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
    }

    #[test]
    fn test_read_oid_multibyte_arc() {
        let oid = decoder(&[0x06, 0x07, 0x2B, 0x06, 0x01, 0x04, 0x01, 0xBF, 0x08])
            .read_oid()
            .unwrap();
        assert_eq!(oid, oid!(1, 3, 6, 1, 4, 1, 8072));
    }

    #[test]
    fn test_read_oid_head_unpacking() {
        assert_eq!(decoder(&[0x06, 0x01, 0x00]).read_oid().unwrap(), oid!(0, 0));
        assert_eq!(
            decoder(&[0x06, 0x01, 0x27]).read_oid().unwrap(),
            oid!(0, 39)
        );
        assert_eq!(
            decoder(&[0x06, 0x01, 0x28]).read_oid().unwrap(),
            oid!(1, 0)
        );
        assert_eq!(
            decoder(&[0x06, 0x01, 0x50]).read_oid().unwrap(),
            oid!(2, 0)
        );
        // First subidentifier above 127: 2.48 packs as 128 = 0x81 0x00
        assert_eq!(
            decoder(&[0x06, 0x02, 0x81, 0x00]).read_oid().unwrap(),
            oid!(2, 48)
        );
    }

    #[test]
    fn test_read_oid_rejects_malformed() {
        // empty content
        assert!(decoder(&[0x06, 0x00]).read_oid().is_err());
        // dangling continuation bit
        assert!(decoder(&[0x06, 0x02, 0x2B, 0x86]).read_oid().is_err());
        // leading 0x80 continuation octet (non-minimal)
        assert!(decoder(&[0x06, 0x03, 0x2B, 0x80, 0x01]).read_oid().is_err());
    }

    #[test]
    fn test_read_ip_address() {
        assert_eq!(
            decoder(&[0x40, 0x04, 192, 168, 1, 1])
                .read_ip_address()
                .unwrap(),
            [192, 168, 1, 1]
        );
        assert!(decoder(&[0x40, 0x03, 1, 2, 3]).read_ip_address().is_err());
    }

    #[test]
    fn test_read_sequence() {
        let mut dec = decoder(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
        let mut seq = dec.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), 1);
        assert_eq!(seq.read_integer().unwrap(), 2);
        assert!(seq.is_empty());
        assert!(dec.is_empty());
    }

    #[test]
    fn test_length_exceeds_remaining() {
        assert!(decoder(&[0x04, 0x05, 0x01]).read_octet_string().is_err());
    }

    #[test]
    fn test_unexpected_tag_reports_both() {
        let err = decoder(&[0x02, 0x01, 0x01]).read_octet_string().unwrap_err();
        match err {
            Error::Decode {
                kind: DecodeErrorKind::UnexpectedTag { expected, actual },
                ..
            } => {
                assert_eq!(expected, 0x04);
                assert_eq!(actual, 0x02);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
