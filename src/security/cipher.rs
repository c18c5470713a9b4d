//! AES-256-CBC envelope for encrypted-at-rest content.
//!
//! Sealed payloads are stored as `"<iv-hex>:<ciphertext-hex>"`. The IV is
//! regenerated on every call, so sealing the same plaintext twice yields
//! different envelopes and ciphertext must never be used as an identity key.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::Rng;
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Required key size for AES-256.
pub const KEY_LEN: usize = 32;

/// Size of the CBC initialization vector.
pub const IV_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be {KEY_LEN} bytes")]
    InvalidKey,

    #[error("encrypted payload is not in iv:ciphertext form")]
    MalformedEnvelope,

    #[error("decryption failed (wrong key or corrupted ciphertext)")]
    DecryptionFailed,

    #[error("content does not match its recorded digest")]
    IntegrityViolation,
}

/// Process-wide symmetric key, loaded once at startup and injected into the
/// components that need it. Compromise of this key compromises every stored
/// record; key rotation is not supported.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    #[must_use]
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a key from its base64 configuration form.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| CryptoError::InvalidKey)?;
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(bytes))
    }

    /// Generate a fresh random key, base64-encoded for configuration storage.
    #[must_use]
    pub fn generate_base64() -> String {
        let bytes: [u8; KEY_LEN] = rand::rng().random();
        BASE64.encode(bytes)
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("EncryptionKey(..)")
    }
}

/// Encrypt `plaintext` under a fresh random IV and return the envelope string.
#[must_use]
pub fn seal(key: &EncryptionKey, plaintext: &[u8]) -> String {
    let iv: [u8; IV_LEN] = rand::rng().random();
    let ciphertext =
        Aes256CbcEnc::new(&key.0.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
}

/// Decrypt an envelope produced by [`seal`].
pub fn open(key: &EncryptionKey, envelope: &str) -> Result<Vec<u8>, CryptoError> {
    let (iv_hex, ciphertext_hex) = envelope
        .split_once(':')
        .ok_or(CryptoError::MalformedEnvelope)?;

    let iv: [u8; IV_LEN] = hex::decode(iv_hex)
        .map_err(|_| CryptoError::MalformedEnvelope)?
        .try_into()
        .map_err(|_| CryptoError::MalformedEnvelope)?;

    let ciphertext = hex::decode(ciphertext_hex).map_err(|_| CryptoError::MalformedEnvelope)?;

    Aes256CbcDec::new(&key.0.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> EncryptionKey {
        EncryptionKey::new([0x42; KEY_LEN])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = test_key();
        let plaintext = b"balance: 1000";

        let envelope = seal(&key, plaintext);
        let opened = open(&key, &envelope).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_envelopes_differ_per_call() {
        let key = test_key();

        let a = seal(&key, b"same content");
        let b = seal(&key, b"same content");

        assert_ne!(a, b);
        assert_eq!(open(&key, &a).unwrap(), open(&key, &b).unwrap());
    }

    #[test]
    fn test_envelope_shape() {
        let key = test_key();
        let envelope = seal(&key, b"x");

        let (iv_hex, ciphertext_hex) = envelope.split_once(':').unwrap();
        assert_eq!(iv_hex.len(), IV_LEN * 2);
        // One full padded block for a 1-byte plaintext.
        assert_eq!(ciphertext_hex.len(), 32);
    }

    #[test]
    fn test_open_rejects_malformed_envelope() {
        let key = test_key();

        assert!(matches!(
            open(&key, "no-separator"),
            Err(CryptoError::MalformedEnvelope)
        ));
        assert!(matches!(
            open(&key, "zzzz:00ff"),
            Err(CryptoError::MalformedEnvelope)
        ));
        assert!(matches!(
            // IV of the wrong length
            open(&key, "00ff:00112233445566778899aabbccddeeff"),
            Err(CryptoError::MalformedEnvelope)
        ));
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let envelope = seal(&test_key(), b"attack at dawn");
        let wrong = EncryptionKey::new([0x01; KEY_LEN]);

        // Wrong key either trips PKCS#7 unpadding or yields garbage that the
        // digest check downstream would catch; the common case is an error.
        match open(&wrong, &envelope) {
            Err(CryptoError::DecryptionFailed) => {}
            Ok(garbage) => assert_ne!(garbage, b"attack at dawn"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_key_from_base64() {
        let encoded = EncryptionKey::generate_base64();
        assert!(EncryptionKey::from_base64(&encoded).is_ok());

        assert!(matches!(
            EncryptionKey::from_base64("dG9vLXNob3J0"),
            Err(CryptoError::InvalidKey)
        ));
        assert!(matches!(
            EncryptionKey::from_base64("!!!not base64!!!"),
            Err(CryptoError::InvalidKey)
        ));
    }
}
