//! Outbound response serialization.
//!
//! Inverts the parser: the same frames are emitted through the reverse
//! encode buffer, and for v3 the scoped PDU is encrypted and the message
//! authenticated with the agent's own engine identity.

use bytes::Bytes;

use crate::ber::EncodeBuf;
use crate::error::{EncodeErrorKind, Error, Result};
use crate::mib::User;
use crate::v3::{self, AUTH_PARAMS_LEN, ENGINE_ID, PRIV_PARAMS_LEN};
use crate::varbind::VarBind;
use crate::version::Version;

use super::{FLAG_AUTH, FLAG_PRIV, MSG_MAX_SIZE, Pdu, V3Header};

/// Encode a PDU into the buffer.
pub(crate) fn push_pdu(buf: &mut EncodeBuf, pdu: &Pdu) {
    buf.push_constructed(pdu.pdu_type.tag(), |buf| {
        VarBind::encode_list(buf, &pdu.varbinds);
        buf.push_integer(pdu.error_index);
        buf.push_integer(pdu.error_status);
        buf.push_integer(pdu.request_id);
    });
}

/// Serialize a v1/v2c response.
pub fn encode_community_response(version: Version, community: &[u8], pdu: &Pdu) -> Bytes {
    let mut buf = EncodeBuf::new();
    buf.push_sequence(|buf| {
        push_pdu(buf, pdu);
        buf.push_octet_string(community);
        buf.push_integer(version.as_i32());
    });
    buf.finish()
}

/// Serialize, encrypt, and authenticate a v3 response.
///
/// The response echoes the request's msgID, user name, context name, and
/// security flags (reportable cleared), and carries this agent's engine
/// identity and clock.
pub fn encode_v3_response(
    request: &V3Header,
    context_name: &[u8],
    user: &User,
    engine_boots: u32,
    engine_time: u32,
    salt: [u8; PRIV_PARAMS_LEN],
    pdu: &Pdu,
) -> Result<Bytes> {
    // Scoped PDU, encoded standalone so it can be encrypted as a unit.
    let mut scoped = EncodeBuf::new();
    scoped.push_sequence(|buf| {
        push_pdu(buf, pdu);
        buf.push_octet_string(context_name);
        buf.push_octet_string(&ENGINE_ID);
    });
    let mut scoped_bytes = scoped.finish_vec();

    let is_auth = request.is_auth();
    let is_priv = request.is_priv();

    if is_priv {
        let priv_key = user
            .priv_key()
            .ok_or_else(|| Error::encode(EncodeErrorKind::NoPrivKey))?;
        v3::encrypt_in_place(priv_key, engine_boots, engine_time, &salt, &mut scoped_bytes)?;
    }

    let response_flags = request.msg_flags & (FLAG_AUTH | FLAG_PRIV);

    let mut buf = EncodeBuf::new();
    buf.push_sequence(|buf| {
        // Scoped PDU data: ciphertext octets or the plain SEQUENCE
        if is_priv {
            buf.push_octet_string(&scoped_bytes);
        } else {
            buf.push_slice(&scoped_bytes);
        }

        // msgSecurityParameters
        let mut usm = EncodeBuf::new();
        usm.push_sequence(|usm| {
            if is_priv {
                usm.push_octet_string(&salt);
            } else {
                usm.push_octet_string(&[]);
            }
            if is_auth {
                // Zeroed now, stamped by authenticate() below
                usm.push_octet_string(&[0u8; AUTH_PARAMS_LEN]);
            } else {
                usm.push_octet_string(&[]);
            }
            usm.push_octet_string(&request.user_name);
            usm.push_integer(engine_time as i32);
            usm.push_integer(engine_boots as i32);
            usm.push_octet_string(&ENGINE_ID);
        });
        buf.push_octet_string(&usm.finish_vec());

        // msgGlobalData
        buf.push_sequence(|buf| {
            buf.push_integer(3); // USM
            buf.push_octet_string(&[response_flags]);
            buf.push_integer(MSG_MAX_SIZE);
            buf.push_integer(request.msg_id);
        });

        buf.push_integer(Version::V3.as_i32());
    });
    let mut message = buf.finish_vec();

    if is_auth {
        let key = user
            .auth_key()
            .ok_or_else(|| Error::encode(EncodeErrorKind::MissingAuthKey))?;
        v3::authenticate(key, &mut message)?;
    }

    Ok(Bytes::from(message))
}
