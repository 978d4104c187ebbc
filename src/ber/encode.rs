//! BER encoding.
//!
//! [`EncodeBuf`] grows from the end of the message toward the start: content
//! is written before the header that describes it, so every constructed
//! length is known by the time it is stamped and no size pre-pass is
//! needed. A single reversal in `finish` produces wire order.
//!
//! The back-to-front discipline also makes minimal-form integers cheap:
//! octets are emitted least-significant first and emission simply stops
//! once the remainder is nothing but sign extension.

use bytes::Bytes;

use super::tag;
use crate::oid::Oid;

/// Reverse-writing BER encoder.
pub struct EncodeBuf {
    /// Message octets in reverse wire order.
    out: Vec<u8>,
}

impl EncodeBuf {
    /// Create an encode buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create an encode buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    /// Number of octets written so far.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Prepend content octets given in wire order.
    pub fn push_slice(&mut self, content: &[u8]) {
        self.out.extend(content.iter().rev());
    }

    /// Prepend a tag octet.
    pub fn push_tag(&mut self, tag: u8) {
        self.out.push(tag);
    }

    /// Prepend a definite-form length for `len` content octets.
    ///
    /// Short form below 0x80, otherwise `0x80 | k` ahead of the k big-endian
    /// magnitude octets, with k minimal.
    pub fn push_length(&mut self, len: usize) {
        if len < 0x80 {
            self.out.push(len as u8);
            return;
        }
        let mut magnitude = len;
        let mut octets = 0u8;
        while magnitude > 0 {
            self.out.push((magnitude & 0xFF) as u8);
            magnitude >>= 8;
            octets += 1;
        }
        self.out.push(0x80 | octets);
    }

    /// Encode a constructed TLV.
    ///
    /// The closure writes the content, fields in reverse order; the measured
    /// length and `tag` are stamped afterwards.
    pub fn push_constructed<F>(&mut self, tag: u8, write_content: F)
    where
        F: FnOnce(&mut Self),
    {
        let mark = self.out.len();
        write_content(self);
        let content_len = self.out.len() - mark;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, write_content: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, write_content);
    }

    /// Encode an INTEGER in minimal two's-complement form.
    pub fn push_integer(&mut self, value: i32) {
        // Emission stops when the unwritten remainder is pure sign
        // extension of the octet just written.
        let mut remainder = value;
        let mut len = 0;
        loop {
            let octet = (remainder & 0xFF) as u8;
            self.out.push(octet);
            len += 1;
            remainder >>= 8;
            let sign_fill: i32 = if octet & 0x80 == 0 { 0 } else { -1 };
            if remainder == sign_fill {
                break;
            }
        }
        self.push_length(len);
        self.push_tag(tag::universal::INTEGER);
    }

    // Minimal unsigned magnitude, plus one 0x00 guard octet when the top
    // bit is set so the value cannot read back as negative.
    fn push_unsigned(&mut self, value: u64) -> usize {
        let mut remainder = value;
        let mut len = 0;
        loop {
            let octet = (remainder & 0xFF) as u8;
            self.out.push(octet);
            len += 1;
            remainder >>= 8;
            if remainder == 0 {
                if octet & 0x80 != 0 {
                    self.out.push(0x00);
                    len += 1;
                }
                return len;
            }
        }
    }

    /// Encode a Counter32, Gauge32, or TimeTicks value under `tag`.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let len = self.push_unsigned(u64::from(value));
        self.push_length(len);
        self.push_tag(tag);
    }

    /// Encode a Counter64.
    pub fn push_integer64(&mut self, value: u64) {
        let len = self.push_unsigned(value);
        self.push_length(len);
        self.push_tag(tag::application::COUNTER64);
    }

    /// Encode a BOOLEAN.
    pub fn push_boolean(&mut self, value: bool) {
        self.push_string(tag::universal::BOOLEAN, &[if value { 0xFF } else { 0x00 }]);
    }

    /// Encode a string-like primitive under `tag` (OCTET STRING, Opaque).
    pub fn push_string(&mut self, tag: u8, content: &[u8]) {
        self.push_slice(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Encode an OCTET STRING.
    pub fn push_octet_string(&mut self, content: &[u8]) {
        self.push_string(tag::universal::OCTET_STRING, content);
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) {
        self.push_string(tag::universal::NULL, &[]);
    }

    /// Encode an exception varbind value (noSuchObject, noSuchInstance,
    /// endOfMibView): a context-class tag with no payload.
    pub fn push_exception(&mut self, tag: u8) {
        debug_assert!(tag::is_exception(tag));
        self.push_string(tag, &[]);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        let content = oid.to_ber_smallvec();
        self.push_string(tag::universal::OBJECT_IDENTIFIER, &content);
    }

    /// Encode an IpAddress.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_string(tag::application::IP_ADDRESS, &addr);
    }

    /// Finalize into wire-order bytes.
    pub fn finish(self) -> Bytes {
        Bytes::from(self.finish_vec())
    }

    /// Finalize into a wire-order `Vec<u8>`.
    pub fn finish_vec(mut self) -> Vec<u8> {
        self.out.reverse();
        self.out
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn wire(build: impl FnOnce(&mut EncodeBuf)) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        build(&mut buf);
        buf.finish_vec()
    }

    #[test]
    fn integer_sign_extension_is_trimmed() {
        assert_eq!(wire(|b| b.push_integer(0)), [0x02, 0x01, 0x00]);
        assert_eq!(wire(|b| b.push_integer(127)), [0x02, 0x01, 0x7F]);
        assert_eq!(wire(|b| b.push_integer(128)), [0x02, 0x02, 0x00, 0x80]);
        assert_eq!(wire(|b| b.push_integer(-1)), [0x02, 0x01, 0xFF]);
        assert_eq!(wire(|b| b.push_integer(-128)), [0x02, 0x01, 0x80]);
        assert_eq!(wire(|b| b.push_integer(-129)), [0x02, 0x02, 0xFF, 0x7F]);
        assert_eq!(
            wire(|b| b.push_integer(i32::MIN)),
            [0x02, 0x04, 0x80, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            wire(|b| b.push_integer(i32::MAX)),
            [0x02, 0x04, 0x7F, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn unsigned_top_bit_gains_guard_octet() {
        let t = tag::application::COUNTER32;
        assert_eq!(wire(|b| b.push_unsigned32(t, 0)), [t, 0x01, 0x00]);
        assert_eq!(wire(|b| b.push_unsigned32(t, 127)), [t, 0x01, 0x7F]);
        assert_eq!(wire(|b| b.push_unsigned32(t, 128)), [t, 0x02, 0x00, 0x80]);
        assert_eq!(wire(|b| b.push_unsigned32(t, 256)), [t, 0x02, 0x01, 0x00]);
        assert_eq!(
            wire(|b| b.push_unsigned32(t, u32::MAX)),
            [t, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn counter64_widths() {
        assert_eq!(wire(|b| b.push_integer64(1)), [0x46, 0x01, 0x01]);
        // u64::MAX: eight magnitude octets plus the guard
        let max = wire(|b| b.push_integer64(u64::MAX));
        assert_eq!(max[..3], [0x46, 0x09, 0x00]);
        assert!(max[3..].iter().all(|&octet| octet == 0xFF));
    }

    #[test]
    fn empty_primitives() {
        assert_eq!(wire(|b| b.push_null()), [0x05, 0x00]);
        assert_eq!(
            wire(|b| b.push_exception(tag::context::END_OF_MIB_VIEW)),
            [0x82, 0x00]
        );
    }

    #[test]
    fn boolean_octets() {
        assert_eq!(wire(|b| b.push_boolean(true)), [0x01, 0x01, 0xFF]);
        assert_eq!(wire(|b| b.push_boolean(false)), [0x01, 0x01, 0x00]);
    }

    #[test]
    fn sequence_header_covers_content() {
        let bytes = wire(|b| {
            b.push_sequence(|b| {
                // Fields reach the wire in the opposite of push order
                b.push_octet_string(b"hi");
                b.push_integer(1);
            })
        });
        assert_eq!(bytes, [0x30, 0x07, 0x02, 0x01, 0x01, 0x04, 0x02, b'h', b'i']);
    }

    #[test]
    fn long_form_length_in_nested_sequence() {
        let payload = [0xAB; 200];
        let bytes = wire(|b| b.push_sequence(|b| b.push_octet_string(&payload)));
        // inner: 04 81 C8 <200 octets>; outer: 30 81 CB
        assert_eq!(bytes[..3], [0x30, 0x81, 0xCB]);
        assert_eq!(bytes[3..6], [0x04, 0x81, 0xC8]);
        assert_eq!(bytes.len(), 206);
    }

    #[test]
    fn push_length_forms() {
        assert_eq!(wire(|b| b.push_length(0)), [0x00]);
        assert_eq!(wire(|b| b.push_length(0x7F)), [0x7F]);
        assert_eq!(wire(|b| b.push_length(0x80)), [0x81, 0x80]);
        assert_eq!(wire(|b| b.push_length(0x100)), [0x82, 0x01, 0x00]);
        assert_eq!(wire(|b| b.push_length(0x1_0000)), [0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn oid_content_packs_arcs() {
        let bytes = wire(|b| b.push_oid(&oid!(1, 3, 6, 1, 4, 1, 8072)));
        assert_eq!(bytes, [0x06, 0x07, 0x2B, 0x06, 0x01, 0x04, 0x01, 0xBF, 0x08]);
    }
}
