//! Inbound datagram parsing.
//!
//! The parser covers the three wire layouts:
//!
//! - v1/v2c: `SEQUENCE { version, community, PDU }`
//! - v3: `SEQUENCE { version, msgGlobalData, msgSecurityParameters,
//!   scopedPDU }`
//!
//! For v3 it also resolves the user, decrypts the scoped PDU when the priv
//! flag is set, and verifies the HMAC when the auth flag is set. Structural
//! failures and unknown users return an error (the datagram is dropped); an
//! HMAC mismatch is only recorded on the datagram.

use bytes::Bytes;
use tracing::{trace, warn};

use crate::ber::{Decoder, tag};
use crate::error::{AuthErrorKind, CryptoErrorKind, DecodeErrorKind, Error, ErrorStatus, Result};
use crate::mib::{Acl, Principal};
use crate::util::HexBytes;
use crate::v3::{self, AUTH_PARAMS_LEN, PRIV_PARAMS_LEN};
use crate::varbind::VarBind;
use crate::version::Version;

use super::{Datagram, Pdu, PduType, ScopedPdu, SecurityLevel, V3Header};

/// Parse one inbound datagram, resolving the principal against `acl`.
pub fn decode_message(buf: &[u8], acl: &Acl) -> Result<Datagram> {
    let data = Bytes::copy_from_slice(buf);
    let mut top = Decoder::new(data);
    let mut outer = top.read_sequence()?;

    let version = Version::from_i32(outer.read_integer()?)?;
    trace!(%version, len = buf.len(), "decoding datagram");

    let datagram = match version {
        Version::V1 | Version::V2c => decode_community(version, &mut outer, acl)?,
        Version::V3 => decode_v3(buf, &mut outer, acl)?,
    };

    // Both the message SEQUENCE and the frame around it must be exhausted
    if !outer.is_empty() {
        return Err(Error::decode(outer.offset(), DecodeErrorKind::TlvOverflow));
    }
    if !top.is_empty() {
        return Err(Error::decode(top.offset(), DecodeErrorKind::TlvOverflow));
    }
    Ok(datagram)
}

fn decode_community(version: Version, outer: &mut Decoder, acl: &Acl) -> Result<Datagram> {
    let community = outer.read_octet_string()?;
    let pdu = decode_pdu(outer)?;

    let principal = acl.community_search(&community).map(Principal::Community);
    if principal.is_none() {
        trace!(community = %HexBytes(&community), "unknown community");
    }

    Ok(Datagram {
        version,
        community: Some(community),
        v3: None,
        scoped: ScopedPdu {
            context_engine_id: Bytes::new(),
            context_name: Bytes::new(),
            pdu,
        },
        principal,
        auth_error: None,
    })
}

fn decode_v3(raw: &[u8], outer: &mut Decoder, acl: &Acl) -> Result<Datagram> {
    // msgGlobalData
    let mut global = outer.read_sequence()?;
    let msg_id = global.read_integer()?;
    let msg_max_size = global.read_integer()?;
    let flags_offset = global.offset();
    let flags_str = global.read_octet_string()?;
    if flags_str.len() != 1 {
        return Err(Error::decode(flags_offset, DecodeErrorKind::InvalidMsgFlags));
    }
    let msg_flags = flags_str[0];
    SecurityLevel::from_flags(msg_flags)
        .map_err(|_| Error::decode(flags_offset, DecodeErrorKind::InvalidMsgFlags))?;
    let model_offset = global.offset();
    let security_model = global.read_integer()?;
    if security_model != 3 {
        return Err(Error::decode(
            model_offset,
            DecodeErrorKind::UnknownSecurityModel(security_model),
        ));
    }
    if !global.is_empty() {
        return Err(Error::decode(global.offset(), DecodeErrorKind::TlvOverflow));
    }

    // msgSecurityParameters: an OCTET STRING wrapping the USM SEQUENCE
    let mut usm = outer.read_octet_string_decoder()?.read_sequence()?;
    let engine_id = usm.read_octet_string()?;
    let engine_boots = usm.read_integer()?;
    let engine_time = usm.read_integer()?;
    let user_name = usm.read_octet_string()?;
    let auth_offset = usm.offset();
    let auth_params = usm.read_octet_string()?;
    let priv_offset = usm.offset();
    let priv_params = usm.read_octet_string()?;
    if !usm.is_empty() {
        return Err(Error::decode(usm.offset(), DecodeErrorKind::TlvOverflow));
    }

    let header = V3Header {
        msg_id,
        msg_max_size,
        msg_flags,
        engine_id,
        engine_boots,
        engine_time,
        user_name,
        priv_params: priv_params.clone(),
    };

    // Resolve the user; an unknown name drops the datagram.
    let Some(user_id) = acl.user_search(&header.user_name) else {
        warn!(user = %HexBytes(&header.user_name), "v3 request from unknown user");
        return Err(Error::auth(AuthErrorKind::UnknownUser));
    };
    let user = acl.user(user_id);

    if header.is_auth() && auth_params.len() != AUTH_PARAMS_LEN {
        return Err(Error::decode(
            auth_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: auth_params.len(),
                max: AUTH_PARAMS_LEN,
            },
        ));
    }

    // Scoped PDU: plaintext SEQUENCE, or an OCTET STRING of ciphertext.
    let scoped = if header.is_priv() {
        if priv_params.len() != PRIV_PARAMS_LEN {
            return Err(Error::decode(
                priv_offset,
                DecodeErrorKind::LengthExceedsMax {
                    length: priv_params.len(),
                    max: PRIV_PARAMS_LEN,
                },
            ));
        }
        let Some(priv_key) = user.priv_key() else {
            return Err(Error::decrypt(CryptoErrorKind::NoPrivKey));
        };

        let ciphertext = outer.read_octet_string()?;
        let mut plaintext = ciphertext.to_vec();
        v3::decrypt_in_place(
            priv_key,
            header.engine_boots as u32,
            header.engine_time as u32,
            &priv_params,
            &mut plaintext,
        )?;
        if plaintext.first() != Some(&tag::universal::SEQUENCE) {
            return Err(Error::decrypt(CryptoErrorKind::InvalidScopedPduTag {
                tag: plaintext.first().copied().unwrap_or(0),
            }));
        }
        decode_scoped_pdu(&mut Decoder::new(Bytes::from(plaintext)))?
    } else {
        decode_scoped_pdu(outer)?
    };

    // Authenticate last; a mismatch is recorded, not fatal, so the access
    // check can answer with an authorization error.
    let mut auth_error = None;
    if header.is_auth() {
        match user.auth_key() {
            Some(key) => {
                if let Err(err) = v3::verify(key, raw) {
                    warn!(user = %HexBytes(&header.user_name), %err, "authentication failed");
                    auth_error = Some(ErrorStatus::AuthorizationError);
                }
            }
            None => {
                warn!(user = %HexBytes(&header.user_name), "auth flag set but user has no auth key");
                auth_error = Some(ErrorStatus::AuthorizationError);
            }
        }
    }

    Ok(Datagram {
        version: Version::V3,
        community: None,
        v3: Some(header),
        scoped,
        principal: Some(Principal::User(user_id)),
        auth_error,
    })
}

fn decode_scoped_pdu(decoder: &mut Decoder) -> Result<ScopedPdu> {
    let mut scope = decoder.read_sequence()?;
    let context_engine_id = scope.read_octet_string()?;
    let context_name = scope.read_octet_string()?;
    let pdu = decode_pdu(&mut scope)?;
    Ok(ScopedPdu {
        context_engine_id,
        context_name,
        pdu,
    })
}

fn decode_pdu(decoder: &mut Decoder) -> Result<Pdu> {
    if decoder.is_empty() {
        return Err(Error::decode(decoder.offset(), DecodeErrorKind::MissingPdu));
    }
    let type_offset = decoder.offset();
    let pdu_tag = decoder.peek_tag()?;
    let pdu_type = PduType::from_tag(pdu_tag)
        .map_err(|_| Error::decode(type_offset, DecodeErrorKind::UnknownPduType(pdu_tag)))?;

    let mut pdu = decoder.read_constructed(pdu_tag)?;
    let request_id = pdu.read_integer()?;
    let error_status = pdu.read_integer()?;
    let error_index = pdu.read_integer()?;
    let varbinds = VarBind::decode_list(&mut pdu)?;
    if !pdu.is_empty() {
        return Err(Error::decode(pdu.offset(), DecodeErrorKind::TlvOverflow));
    }

    Ok(Pdu {
        pdu_type,
        request_id,
        error_status,
        error_index,
        varbinds,
    })
}
