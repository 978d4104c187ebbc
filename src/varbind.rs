//! Variable binding (VarBind) type.
//!
//! A varbind is the unit of request and response: one OID paired with one
//! value. A request carries an ordered list of them and the response list
//! lines up index-for-index (GETBULK excepted, which multiplies the
//! repeating slots). The list codec lives here too, as the
//! [`VarBind::encode_list`]/[`VarBind::decode_list`] pair.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::Result;
use crate::oid::Oid;
use crate::value::Value;

/// One OID-value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    /// The object identifier.
    pub oid: Oid,
    /// The value.
    pub value: Value,
}

impl VarBind {
    /// Pair an OID with a value.
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// A request placeholder: the OID with a NULL value.
    pub fn null(oid: Oid) -> Self {
        Self::new(oid, Value::Null)
    }

    /// Encode as a `SEQUENCE { name, value }`.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::universal::SEQUENCE, |fields| {
            self.value.encode(fields);
            fields.push_oid(&self.oid);
        });
    }

    /// Decode one varbind SEQUENCE.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut fields = decoder.read_sequence()?;
        Ok(Self {
            oid: fields.read_oid()?,
            value: Value::decode(&mut fields)?,
        })
    }

    /// Octets this varbind occupies on the wire, headers included.
    ///
    /// The response builders track their running size with this to stay
    /// inside the message budget.
    pub fn wire_size(&self) -> usize {
        let mut probe = EncodeBuf::with_capacity(64);
        self.encode(&mut probe);
        probe.len()
    }

    /// Encode a varbind-list SEQUENCE (the PDU body tail).
    pub fn encode_list(buf: &mut EncodeBuf, list: &[VarBind]) {
        buf.push_sequence(|body| {
            // Back to front, so the list reads forward after the final
            // buffer reversal
            for vb in list.iter().rev() {
                vb.encode(body);
            }
        });
    }

    /// Decode a varbind-list SEQUENCE.
    pub fn decode_list(decoder: &mut Decoder) -> Result<Vec<VarBind>> {
        let mut body = decoder.read_sequence()?;
        let mut list = Vec::new();
        while body.remaining() > 0 {
            list.push(Self::decode(&mut body)?);
        }
        Ok(list)
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use bytes::Bytes;

    fn reparse(list: &[VarBind]) -> Vec<VarBind> {
        let mut buf = EncodeBuf::new();
        VarBind::encode_list(&mut buf, list);
        let mut decoder = Decoder::new(buf.finish());
        let decoded = VarBind::decode_list(&mut decoder).unwrap();
        assert!(decoder.is_empty());
        decoded
    }

    #[test]
    fn test_single_varbind_wire_shape() {
        let vb = VarBind::new(oid!(1, 3, 6, 1), Value::Integer(5));
        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        assert_eq!(
            &buf.finish()[..],
            // SEQUENCE { OID 1.3.6.1, INTEGER 5 }
            &[0x30, 0x08, 0x06, 0x03, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x05]
        );
    }

    #[test]
    fn test_decode_inverts_encode() {
        let vb = VarBind::new(
            oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 1),
            Value::Counter64(u64::MAX),
        );
        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        assert_eq!(VarBind::decode(&mut decoder).unwrap(), vb);
    }

    #[test]
    fn test_list_preserves_order_and_exceptions() {
        let list = vec![
            VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                Value::OctetString(Bytes::from_static(b"SmithSNMP")),
            ),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(123456)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 99, 0), Value::NoSuchObject),
        ];

        let decoded = reparse(&list);
        assert_eq!(decoded, list);
        assert!(decoded[2].value.is_exception());
    }

    #[test]
    fn test_empty_list() {
        assert!(reparse(&[]).is_empty());
    }

    #[test]
    fn test_wire_size_is_exact() {
        for vb in [
            VarBind::null(oid!(1, 3, 6, 1)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::Integer(-1)),
            VarBind::new(
                oid!(1, 3, 6, 1, 4, 1, 8072, 1),
                Value::Opaque(Bytes::from_static(&[0u8; 130])),
            ),
        ] {
            let mut buf = EncodeBuf::new();
            vb.encode(&mut buf);
            assert_eq!(vb.wire_size(), buf.finish().len(), "varbind {vb}");
        }
    }

    #[test]
    fn test_null_constructor_and_display() {
        let vb = VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
        assert_eq!(vb.value, Value::Null);

        let shown = vb.to_string();
        assert!(shown.starts_with("1.3.6.1.2.1.1.1.0 = "));

        let shown = VarBind::new(oid!(1, 3, 6, 1), Value::NoSuchObject).to_string();
        assert!(shown.ends_with("noSuchObject"));
    }
}
