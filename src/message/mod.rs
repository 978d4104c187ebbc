//! SNMP message structures: PDU, v3 header, scoped PDU.

mod decode;
mod encode;

pub use decode::decode_message;
pub use encode::{encode_community_response, encode_v3_response};

use bytes::Bytes;

use crate::ber::tag;
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::mib::Principal;
use crate::varbind::VarBind;
use crate::version::Version;

/// msgFlags bit: the message is authenticated.
pub const FLAG_AUTH: u8 = 0x01;
/// msgFlags bit: the scoped PDU is encrypted.
pub const FLAG_PRIV: u8 = 0x02;
/// msgFlags bit: a report PDU is expected on failure.
pub const FLAG_REPORTABLE: u8 = 0x04;

/// The msgMaxSize this agent announces in responses.
pub const MSG_MAX_SIZE: i32 = 65507;

/// Security level of a v3 exchange, ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    /// Neither authentication nor privacy.
    NoAuthNoPriv,
    /// Authentication without privacy.
    AuthNoPriv,
    /// Authentication and privacy.
    AuthPriv,
}

impl SecurityLevel {
    /// Derive the level from msgFlags.
    pub fn from_flags(flags: u8) -> Result<Self> {
        match (flags & FLAG_AUTH != 0, flags & FLAG_PRIV != 0) {
            (false, false) => Ok(Self::NoAuthNoPriv),
            (true, false) => Ok(Self::AuthNoPriv),
            (true, true) => Ok(Self::AuthPriv),
            // Privacy without authentication is forbidden (RFC 3412)
            (false, true) => Err(Error::decode(0, DecodeErrorKind::InvalidMsgFlags)),
        }
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAuthNoPriv => write!(f, "noAuthNoPriv"),
            Self::AuthNoPriv => write!(f, "authNoPriv"),
            Self::AuthPriv => write!(f, "authPriv"),
        }
    }
}

/// PDU type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    /// GetRequest-PDU (0xA0).
    GetRequest,
    /// GetNextRequest-PDU (0xA1).
    GetNextRequest,
    /// Response-PDU (0xA2).
    Response,
    /// SetRequest-PDU (0xA3).
    SetRequest,
    /// GetBulkRequest-PDU (0xA5).
    GetBulkRequest,
}

impl PduType {
    /// The BER tag of this PDU type.
    pub fn tag(self) -> u8 {
        match self {
            Self::GetRequest => tag::pdu::GET_REQUEST,
            Self::GetNextRequest => tag::pdu::GET_NEXT_REQUEST,
            Self::Response => tag::pdu::RESPONSE,
            Self::SetRequest => tag::pdu::SET_REQUEST,
            Self::GetBulkRequest => tag::pdu::GET_BULK_REQUEST,
        }
    }

    /// Parse a request PDU tag the agent services.
    pub fn from_tag(value: u8) -> Result<Self> {
        match value {
            tag::pdu::GET_REQUEST => Ok(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Ok(Self::GetNextRequest),
            tag::pdu::RESPONSE => Ok(Self::Response),
            tag::pdu::SET_REQUEST => Ok(Self::SetRequest),
            tag::pdu::GET_BULK_REQUEST => Ok(Self::GetBulkRequest),
            other => Err(Error::decode(0, DecodeErrorKind::UnknownPduType(other))),
        }
    }
}

/// A protocol data unit.
///
/// For GetBulkRequest the two integers after the request-id are
/// non-repeaters and max-repetitions (RFC 3416); use the accessors rather
/// than reading the error fields directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    /// PDU type.
    pub pdu_type: PduType,
    /// Request identifier, echoed in the response.
    pub request_id: i32,
    /// Error status (GetBulk: non-repeaters).
    pub error_status: i32,
    /// 1-based error index (GetBulk: max-repetitions).
    pub error_index: i32,
    /// The varbind list.
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Build a response PDU.
    pub fn response(request_id: i32, status: ErrorStatus, index: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status: status.as_i32(),
            error_index: index,
            varbinds,
        }
    }

    /// GetBulk non-repeaters (clamped at zero).
    pub fn non_repeaters(&self) -> usize {
        self.error_status.max(0) as usize
    }

    /// GetBulk max-repetitions (clamped at zero).
    pub fn max_repetitions(&self) -> usize {
        self.error_index.max(0) as usize
    }
}

/// Parsed msgGlobalData and USM security parameters of a v3 message.
#[derive(Debug, Clone)]
pub struct V3Header {
    /// msgID, echoed in the response.
    pub msg_id: i32,
    /// msgMaxSize announced by the sender.
    pub msg_max_size: i32,
    /// msgFlags octet.
    pub msg_flags: u8,
    /// msgAuthoritativeEngineID.
    pub engine_id: Bytes,
    /// msgAuthoritativeEngineBoots.
    pub engine_boots: i32,
    /// msgAuthoritativeEngineTime.
    pub engine_time: i32,
    /// msgUserName.
    pub user_name: Bytes,
    /// msgPrivacyParameters (8 bytes when privacy is in use).
    pub priv_params: Bytes,
}

impl V3Header {
    /// Security level claimed by msgFlags.
    pub fn security_level(&self) -> SecurityLevel {
        // Flags were validated during parsing
        SecurityLevel::from_flags(self.msg_flags).unwrap_or(SecurityLevel::NoAuthNoPriv)
    }

    /// Whether the auth flag is set.
    pub fn is_auth(&self) -> bool {
        self.msg_flags & FLAG_AUTH != 0
    }

    /// Whether the priv flag is set.
    pub fn is_priv(&self) -> bool {
        self.msg_flags & FLAG_PRIV != 0
    }
}

/// The scoped PDU of a v3 message (trivial for v1/v2c).
#[derive(Debug, Clone)]
pub struct ScopedPdu {
    /// contextEngineID.
    pub context_engine_id: Bytes,
    /// contextName.
    pub context_name: Bytes,
    /// The request PDU.
    pub pdu: Pdu,
}

/// One fully parsed inbound datagram.
///
/// Parsing resolves the principal (community or user) and runs v3
/// decryption and authentication; an HMAC mismatch is recorded in
/// `auth_error` rather than aborting, so the access check can surface it
/// per varbind.
#[derive(Debug)]
pub struct Datagram {
    /// Protocol version.
    pub version: Version,
    /// Community string (v1/v2c).
    pub community: Option<Bytes>,
    /// v3 header (v3 only).
    pub v3: Option<V3Header>,
    /// The scoped PDU carrying the request.
    pub scoped: ScopedPdu,
    /// The resolved principal, when the name matched a registry record.
    pub principal: Option<Principal>,
    /// Authentication failure recorded during parsing.
    pub auth_error: Option<ErrorStatus>,
}

impl Datagram {
    /// The request PDU.
    pub fn pdu(&self) -> &Pdu {
        &self.scoped.pdu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_level_from_flags() {
        assert_eq!(
            SecurityLevel::from_flags(0x00).unwrap(),
            SecurityLevel::NoAuthNoPriv
        );
        assert_eq!(
            SecurityLevel::from_flags(FLAG_AUTH).unwrap(),
            SecurityLevel::AuthNoPriv
        );
        assert_eq!(
            SecurityLevel::from_flags(FLAG_AUTH | FLAG_PRIV).unwrap(),
            SecurityLevel::AuthPriv
        );
        assert_eq!(
            SecurityLevel::from_flags(FLAG_REPORTABLE | FLAG_AUTH).unwrap(),
            SecurityLevel::AuthNoPriv
        );
        // priv without auth is invalid
        assert!(SecurityLevel::from_flags(FLAG_PRIV).is_err());
    }

    #[test]
    fn test_security_level_ordering() {
        assert!(SecurityLevel::NoAuthNoPriv < SecurityLevel::AuthNoPriv);
        assert!(SecurityLevel::AuthNoPriv < SecurityLevel::AuthPriv);
    }

    #[test]
    fn test_pdu_type_tags() {
        assert_eq!(PduType::GetRequest.tag(), 0xA0);
        assert_eq!(PduType::Response.tag(), 0xA2);
        assert_eq!(PduType::GetBulkRequest.tag(), 0xA5);
        assert_eq!(PduType::from_tag(0xA1).unwrap(), PduType::GetNextRequest);
        assert!(PduType::from_tag(0xA8).is_err());
    }

    #[test]
    fn test_bulk_accessors_clamp() {
        let pdu = Pdu {
            pdu_type: PduType::GetBulkRequest,
            request_id: 1,
            error_status: -2,
            error_index: 3,
            varbinds: Vec::new(),
        };
        assert_eq!(pdu.non_repeaters(), 0);
        assert_eq!(pdu.max_repetitions(), 3);
    }
}
