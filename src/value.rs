//! SNMP value types.
//!
//! [`Value`] is the tagged union carried by a varbind. The wire tag fully
//! determines the variant, so an invalid tag/payload combination cannot be
//! constructed. The three RFC 3416 exception markers are variants too: they
//! carry no payload and exist only in responses.

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// Maximum accepted OCTET STRING / Opaque payload in a varbind.
pub const MAX_VALUE_LEN: usize = 1024;

/// An SNMP value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// ASN.1 BOOLEAN (tag 0x01).
    Boolean(bool),
    /// ASN.1 INTEGER (tag 0x02).
    Integer(i32),
    /// OCTET STRING (tag 0x04).
    OctetString(Bytes),
    /// NULL (tag 0x05), the placeholder value of request varbinds.
    Null,
    /// OBJECT IDENTIFIER (tag 0x06).
    ObjectIdentifier(Oid),
    /// IpAddress (tag 0x40).
    IpAddress([u8; 4]),
    /// Counter32 (tag 0x41).
    Counter32(u32),
    /// Gauge32/Unsigned32 (tag 0x42).
    Gauge32(u32),
    /// TimeTicks in hundredths of a second (tag 0x43).
    TimeTicks(u32),
    /// Opaque (tag 0x44).
    Opaque(Bytes),
    /// Counter64 (tag 0x46).
    Counter64(u64),
    /// noSuchObject exception (tag 0x80).
    NoSuchObject,
    /// noSuchInstance exception (tag 0x81).
    NoSuchInstance,
    /// endOfMibView exception (tag 0x82).
    EndOfMibView,
}

impl Value {
    /// The BER tag of this value.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Boolean(_) => tag::universal::BOOLEAN,
            Value::Integer(_) => tag::universal::INTEGER,
            Value::OctetString(_) => tag::universal::OCTET_STRING,
            Value::Null => tag::universal::NULL,
            Value::ObjectIdentifier(_) => tag::universal::OBJECT_IDENTIFIER,
            Value::IpAddress(_) => tag::application::IP_ADDRESS,
            Value::Counter32(_) => tag::application::COUNTER32,
            Value::Gauge32(_) => tag::application::GAUGE32,
            Value::TimeTicks(_) => tag::application::TIMETICKS,
            Value::Opaque(_) => tag::application::OPAQUE,
            Value::Counter64(_) => tag::application::COUNTER64,
            Value::NoSuchObject => tag::context::NO_SUCH_OBJECT,
            Value::NoSuchInstance => tag::context::NO_SUCH_INSTANCE,
            Value::EndOfMibView => tag::context::END_OF_MIB_VIEW,
        }
    }

    /// Whether this is one of the three exception markers.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Boolean(b) => buf.push_boolean(*b),
            Value::Integer(i) => buf.push_integer(*i),
            Value::OctetString(s) => buf.push_octet_string(s),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(s) => buf.push_string(tag::application::OPAQUE, s),
            Value::Counter64(v) => buf.push_integer64(*v),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
                buf.push_exception(self.tag());
            }
        }
    }

    /// Decode from BER, dispatching on the tag.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let offset = decoder.offset();
        let next = decoder.peek_tag()?;
        match next {
            tag::universal::BOOLEAN => {
                let (_, content) = decoder.read_tlv()?;
                if content.len() != 1 {
                    return Err(Error::decode(offset, DecodeErrorKind::InvalidLength));
                }
                Ok(Value::Boolean(content[0] != 0))
            }
            tag::universal::INTEGER => Ok(Value::Integer(decoder.read_integer()?)),
            tag::universal::OCTET_STRING => {
                let s = decoder.read_octet_string()?;
                check_value_len(s.len(), offset)?;
                Ok(Value::OctetString(s))
            }
            tag::universal::NULL => {
                decoder.read_null()?;
                Ok(Value::Null)
            }
            tag::universal::OBJECT_IDENTIFIER => Ok(Value::ObjectIdentifier(decoder.read_oid()?)),
            tag::application::IP_ADDRESS => Ok(Value::IpAddress(decoder.read_ip_address()?)),
            tag::application::COUNTER32 => Ok(Value::Counter32(
                decoder.read_unsigned32(tag::application::COUNTER32)?,
            )),
            tag::application::GAUGE32 => Ok(Value::Gauge32(
                decoder.read_unsigned32(tag::application::GAUGE32)?,
            )),
            tag::application::TIMETICKS => Ok(Value::TimeTicks(
                decoder.read_unsigned32(tag::application::TIMETICKS)?,
            )),
            tag::application::OPAQUE => {
                let (_, content) = decoder.read_tlv()?;
                check_value_len(content.len(), offset)?;
                Ok(Value::Opaque(content))
            }
            tag::application::COUNTER64 => Ok(Value::Counter64(decoder.read_integer64()?)),
            tag::context::NO_SUCH_OBJECT
            | tag::context::NO_SUCH_INSTANCE
            | tag::context::END_OF_MIB_VIEW => {
                let (t, content) = decoder.read_tlv()?;
                if !content.is_empty() {
                    return Err(Error::decode(offset, DecodeErrorKind::InvalidLength));
                }
                Ok(match t {
                    tag::context::NO_SUCH_OBJECT => Value::NoSuchObject,
                    tag::context::NO_SUCH_INSTANCE => Value::NoSuchInstance,
                    _ => Value::EndOfMibView,
                })
            }
            other => Err(Error::decode(
                offset,
                DecodeErrorKind::UnknownValueTag(other),
            )),
        }
    }
}

fn check_value_len(len: usize, offset: usize) -> Result<()> {
    if len > MAX_VALUE_LEN {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::OctetStringTooLong {
                length: len,
                max: MAX_VALUE_LEN,
            },
        ));
    }
    Ok(())
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::OctetString(s) => match std::str::from_utf8(s) {
                Ok(text) if text.chars().all(|c| !c.is_control()) => write!(f, "{}", text),
                _ => {
                    for b in s.iter() {
                        write!(f, "{:02x}", b)?;
                    }
                    Ok(())
                }
            },
            Value::Null => write!(f, "null"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress([a, b, c, d]) => write!(f, "{}.{}.{}.{}", a, b, c, d),
            Value::Counter32(v) => write!(f, "{}", v),
            Value::Gauge32(v) => write!(f, "{}", v),
            Value::TimeTicks(v) => write!(f, "{}", v),
            Value::Opaque(s) => {
                for b in s.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::OctetString(Bytes::from(v.into_bytes()))
    }
}
