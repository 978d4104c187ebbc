//! USM authentication: key localization and HMAC-96.
//!
//! Key derivation follows RFC 3414 appendix A.2: the passphrase is expanded
//! to exactly 1 MiB by repetition and hashed, and the resulting digest is
//! localized to the authoritative engine by hashing
//! `digest ++ engine_id ++ digest`.

use std::ops::Range;

use digest::Digest;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{AUTH_PARAMS_LEN, AuthProtocol};
use crate::ber::Decoder;
use crate::error::{AuthErrorKind, Error, Result};

/// Total bytes of passphrase expansion hashed during key derivation.
const EXPANSION_LEN: usize = 1024 * 1024;

/// A localized authentication key.
///
/// Holds only the derived key, never the passphrase. Zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct LocalizedKey {
    #[zeroize(skip)]
    protocol: AuthProtocol,
    key: Vec<u8>,
}

impl LocalizedKey {
    /// The protocol this key was derived for.
    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// The raw key octets (16 for MD5, 20 for SHA).
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs
        write!(f, "LocalizedKey({}, {} bytes)", self.protocol, self.key.len())
    }
}

/// Derive the localized key for a user passphrase.
pub fn localize_key(protocol: AuthProtocol, passphrase: &[u8], engine_id: &[u8]) -> LocalizedKey {
    let key = match protocol {
        AuthProtocol::Md5 => password_to_key::<Md5>(passphrase, engine_id),
        AuthProtocol::Sha1 => password_to_key::<Sha1>(passphrase, engine_id),
    };
    LocalizedKey { protocol, key }
}

fn password_to_key<D: Digest>(passphrase: &[u8], engine_id: &[u8]) -> Vec<u8> {
    debug_assert!(!passphrase.is_empty(), "empty passphrase");

    let mut hasher = D::new();
    let mut fed = 0usize;
    let mut cursor = 0usize;
    let mut block = [0u8; 64];
    while fed < EXPANSION_LEN {
        for slot in block.iter_mut() {
            *slot = passphrase[cursor];
            cursor = (cursor + 1) % passphrase.len();
        }
        hasher.update(block);
        fed += block.len();
    }
    let digest = hasher.finalize();

    let mut localizer = D::new();
    localizer.update(&digest);
    localizer.update(engine_id);
    localizer.update(&digest);
    localizer.finalize().to_vec()
}

/// Locate the content range of msgAuthenticationParameters inside an
/// encoded v3 message.
///
/// Walks the outer structure (SEQUENCE, version, msgGlobalData,
/// msgSecurityParameters) instead of pattern-searching, so payload bytes
/// can never be mistaken for the field.
pub fn locate_auth_params(message: &[u8]) -> Result<Range<usize>> {
    let mut outer = Decoder::new(bytes::Bytes::copy_from_slice(message)).read_sequence()?;
    let _version = outer.read_integer()?;
    let _global = outer.read_sequence()?;
    let mut usm = outer.read_octet_string_decoder()?.read_sequence()?;
    let _engine_id = usm.read_octet_string()?;
    let _boots = usm.read_integer()?;
    let _time = usm.read_integer()?;
    let _user = usm.read_octet_string()?;
    let mac = usm.read_octet_string()?;
    if mac.len() != AUTH_PARAMS_LEN {
        return Err(Error::auth(AuthErrorKind::WrongMacLength {
            expected: AUTH_PARAMS_LEN,
            actual: mac.len(),
        }));
    }
    let end = usm.offset();
    Ok(end - AUTH_PARAMS_LEN..end)
}

/// Compute the 12-byte HMAC over `message` with the auth params zeroed,
/// and stamp it into place. Used on the outbound path.
pub fn authenticate(key: &LocalizedKey, message: &mut [u8]) -> Result<()> {
    let range = locate_auth_params(message)
        .map_err(|_| Error::encode(crate::error::EncodeErrorKind::MissingAuthParams))?;
    message[range.clone()].fill(0);
    let mac = compute_mac(key, message);
    message[range].copy_from_slice(&mac);
    Ok(())
}

/// Verify the 12-byte HMAC of an inbound message.
///
/// The comparison is constant-time. The message itself is not modified;
/// the MAC is recomputed over a copy with zeroed auth params.
pub fn verify(key: &LocalizedKey, message: &[u8]) -> Result<()> {
    let range = locate_auth_params(message)?;
    let received: [u8; AUTH_PARAMS_LEN] = message[range.clone()]
        .try_into()
        .expect("range is AUTH_PARAMS_LEN wide");

    let mut scratch = message.to_vec();
    scratch[range].fill(0);
    let expected = compute_mac(key, &scratch);

    if expected[..].ct_eq(&received[..]).into() {
        Ok(())
    } else {
        Err(Error::auth(AuthErrorKind::HmacMismatch))
    }
}

fn compute_mac(key: &LocalizedKey, message: &[u8]) -> [u8; AUTH_PARAMS_LEN] {
    let digest = match key.protocol {
        AuthProtocol::Md5 => {
            let mut mac = Hmac::<Md5>::new_from_slice(&key.key).expect("HMAC accepts any key size");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        AuthProtocol::Sha1 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(&key.key).expect("HMAC accepts any key size");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
    };
    let mut out = [0u8; AUTH_PARAMS_LEN];
    out.copy_from_slice(&digest[..AUTH_PARAMS_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 3414 appendix A.3 test vectors: passphrase "maplesyrup",
    // engine ID 000000000000000000000002.
    const RFC_ENGINE_ID: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

    #[test]
    fn test_md5_key_localization_rfc_vector() {
        let key = localize_key(AuthProtocol::Md5, b"maplesyrup", &RFC_ENGINE_ID);
        assert_eq!(
            key.as_bytes(),
            &[
                0x52, 0x6f, 0x5e, 0xed, 0x9f, 0xcc, 0xe2, 0x6f, 0x89, 0x64, 0xc2, 0x93, 0x07,
                0x87, 0xd8, 0x2b
            ]
        );
    }

    #[test]
    fn test_sha1_key_localization_rfc_vector() {
        let key = localize_key(AuthProtocol::Sha1, b"maplesyrup", &RFC_ENGINE_ID);
        assert_eq!(
            key.as_bytes(),
            &[
                0x66, 0x95, 0xfe, 0xbc, 0x92, 0x88, 0xe3, 0x62, 0x82, 0x23, 0x5f, 0xc7, 0x15,
                0x1f, 0x12, 0x84, 0x97, 0xb3, 0x8f, 0x3f
            ]
        );
    }

    #[test]
    fn test_localization_depends_on_engine() {
        let a = localize_key(AuthProtocol::Sha1, b"authpass", &RFC_ENGINE_ID);
        let b = localize_key(AuthProtocol::Sha1, b"authpass", &super::super::ENGINE_ID);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    fn sample_v3_message() -> Vec<u8> {
        use crate::ber::EncodeBuf;

        // Minimal v3 frame: header fields plus an empty scoped PDU stand-in.
        let mut usm = EncodeBuf::new();
        usm.push_sequence(|buf| {
            buf.push_octet_string(&[0u8; 8]); // privParams
            buf.push_octet_string(&[0u8; AUTH_PARAMS_LEN]); // authParams
            buf.push_octet_string(b"alice");
            buf.push_integer(7); // engineTime
            buf.push_integer(1); // engineBoots
            buf.push_octet_string(&super::super::ENGINE_ID);
        });
        let usm_bytes = usm.finish();

        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string(b"\x30\x00"); // placeholder scoped data
            buf.push_octet_string(&usm_bytes);
            buf.push_sequence(|buf| {
                buf.push_integer(3); // securityModel (USM)
                buf.push_octet_string(&[0x03]); // flags: authPriv... auth|priv
                buf.push_integer(65507); // maxSize
                buf.push_integer(0x1234); // msgID
            });
            buf.push_integer(3); // version
        });
        buf.finish_vec()
    }

    #[test]
    fn test_locate_auth_params() {
        let msg = sample_v3_message();
        let range = locate_auth_params(&msg).unwrap();
        assert_eq!(range.len(), AUTH_PARAMS_LEN);
        assert!(msg[range].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_authenticate_then_verify() {
        let key = localize_key(AuthProtocol::Sha1, b"authpass", &super::super::ENGINE_ID);
        let mut msg = sample_v3_message();

        authenticate(&key, &mut msg).unwrap();
        verify(&key, &msg).unwrap();

        // A flipped payload byte must fail verification
        let last = msg.len() - 1;
        msg[last] ^= 0xFF;
        assert!(matches!(
            verify(&key, &msg),
            Err(Error::AuthenticationFailed {
                kind: AuthErrorKind::HmacMismatch
            })
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let key = localize_key(AuthProtocol::Md5, b"authpass", &super::super::ENGINE_ID);
        let other = localize_key(AuthProtocol::Md5, b"otherpass", &super::super::ENGINE_ID);
        let mut msg = sample_v3_message();
        authenticate(&key, &mut msg).unwrap();
        assert!(verify(&other, &msg).is_err());
    }
}
