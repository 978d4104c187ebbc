//! USM privacy: AES-128-CFB (RFC 3826).
//!
//! The cipher IV is built from the authoritative engine clock and the
//! per-message 8-byte salt: `boots(4 BE) ++ time(4 BE) ++ salt(8)`.
//! Encryption and decryption run in place over the scoped-PDU octets;
//! CFB needs no padding.

use std::sync::atomic::{AtomicU64, Ordering};

use aes::Aes128;
use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{LocalizedKey, PRIV_PARAMS_LEN};
use crate::error::{CryptoErrorKind, Error, Result};

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;

/// AES privacy key: the first 16 bytes of the localized auth key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: [u8; 16],
}

impl PrivKey {
    /// Cut a privacy key from a localized authentication key.
    ///
    /// Returns an error if the auth key is too short, which cannot happen
    /// for the supported MD5/SHA protocols.
    pub fn from_localized(auth_key: &LocalizedKey) -> Result<Self> {
        let bytes = auth_key.as_bytes();
        if bytes.len() < 16 {
            return Err(Error::decrypt(CryptoErrorKind::NoPrivKey));
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&bytes[..16]);
        Ok(Self { key })
    }

    /// The raw key octets.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.key
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivKey(16 bytes)")
    }
}

fn build_iv(engine_boots: u32, engine_time: u32, salt: &[u8]) -> Result<[u8; 16]> {
    if salt.len() != PRIV_PARAMS_LEN {
        return Err(Error::decrypt(CryptoErrorKind::InvalidPrivParamsLength {
            expected: PRIV_PARAMS_LEN,
            actual: salt.len(),
        }));
    }
    let mut iv = [0u8; 16];
    iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
    iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
    iv[8..].copy_from_slice(salt);
    Ok(iv)
}

/// Encrypt scoped-PDU octets in place.
pub fn encrypt_in_place(
    key: &PrivKey,
    engine_boots: u32,
    engine_time: u32,
    salt: &[u8],
    data: &mut [u8],
) -> Result<()> {
    let iv = build_iv(engine_boots, engine_time, salt)?;
    Aes128CfbEnc::new(&key.key.into(), &iv.into()).encrypt(data);
    Ok(())
}

/// Decrypt scoped-PDU octets in place.
pub fn decrypt_in_place(
    key: &PrivKey,
    engine_boots: u32,
    engine_time: u32,
    salt: &[u8],
    data: &mut [u8],
) -> Result<()> {
    let iv = build_iv(engine_boots, engine_time, salt)?;
    Aes128CfbDec::new(&key.key.into(), &iv.into()).decrypt(data);
    Ok(())
}

/// Monotonic salt source for outbound privParameters.
///
/// Seeded from the OS RNG once, then incremented per message so an IV is
/// never reused within an engine boot.
pub struct SaltCounter {
    counter: AtomicU64,
}

impl SaltCounter {
    /// Create a counter seeded from the OS RNG.
    pub fn new() -> Self {
        let mut seed = [0u8; 8];
        // A failed RNG read leaves a zero seed; uniqueness then rests on
        // the counter alone, which still never repeats within a boot.
        let _ = getrandom::fill(&mut seed);
        Self {
            counter: AtomicU64::new(u64::from_be_bytes(seed)),
        }
    }

    /// Produce the next 8-byte salt.
    pub fn next_salt(&self) -> [u8; PRIV_PARAMS_LEN] {
        self.counter
            .fetch_add(1, Ordering::Relaxed)
            .to_be_bytes()
    }
}

impl Default for SaltCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v3::{AuthProtocol, ENGINE_ID, localize_key};

    fn test_key() -> PrivKey {
        let auth = localize_key(AuthProtocol::Sha1, b"privpass", &ENGINE_ID);
        PrivKey::from_localized(&auth).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let salt = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let plaintext = b"\x30\x0bscoped pdu".to_vec();

        let mut data = plaintext.clone();
        encrypt_in_place(&key, 1, 42, &salt, &mut data).unwrap();
        assert_ne!(data, plaintext);

        decrypt_in_place(&key, 1, 42, &salt, &mut data).unwrap();
        assert_eq!(data, plaintext);
    }

    #[test]
    fn test_decrypt_with_wrong_iv_fails() {
        let key = test_key();
        let salt = [0u8; 8];
        let plaintext = b"some scoped pdu data".to_vec();

        let mut data = plaintext.clone();
        encrypt_in_place(&key, 1, 42, &salt, &mut data).unwrap();
        decrypt_in_place(&key, 1, 43, &salt, &mut data).unwrap();
        assert_ne!(data, plaintext);
    }

    #[test]
    fn test_bad_salt_length_rejected() {
        let key = test_key();
        let mut data = vec![0u8; 16];
        assert!(encrypt_in_place(&key, 0, 0, &[0u8; 7], &mut data).is_err());
    }

    #[test]
    fn test_salt_counter_monotonic() {
        let counter = SaltCounter::new();
        let a = counter.next_salt();
        let b = counter.next_salt();
        assert_ne!(a, b);
        assert_eq!(u64::from_be_bytes(b), u64::from_be_bytes(a).wrapping_add(1));
    }

    #[test]
    fn test_priv_key_cut_from_auth_key() {
        let auth = localize_key(AuthProtocol::Sha1, b"privpass", &ENGINE_ID);
        let priv_key = PrivKey::from_localized(&auth).unwrap();
        assert_eq!(priv_key.as_bytes(), &auth.as_bytes()[..16]);
    }
}
