//! AES-256-GCM-SIV encryption and decryption of individual string fields.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) with a fresh random nonce
//! per call. Two encryptions of the same value under the same key produce
//! unrelated envelopes, and the authentication tag makes a wrong key fail
//! loudly instead of yielding different text.
//!
//! **Do NOT substitute plain AES-256-GCM with a fixed nonce.** GCM nonce reuse
//! is catastrophic: it breaks both confidentiality and authentication.

use std::fmt;

use aes_gcm_siv::{
    aead::{
        rand_core::{CryptoRng, RngCore},
        Aead, KeyInit, OsRng,
    },
    Aes256GcmSiv, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;
use zeroize::Zeroize;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM-SIV authentication tag.
const TAG_LEN: usize = 16;

/// Version tag that appears at the start of every encrypted field value.
pub const VERSION_PREFIX: &str = "v1";

/// Longest accepted plaintext, counted in Unicode scalar values.
pub const MAX_FIELD_CHARS: usize = 256;

/// Symmetric key for one user's card fields.
///
/// The bytes are overwritten with zeroes on drop and never printed.
pub struct EncryptionKey(Box<[u8; KEY_LEN]>);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// An encoded ciphertext envelope: `v1.<base64url(nonce)>.<base64url(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ciphertext(String);

impl Ciphertext {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Ciphertext> for String {
    fn from(c: Ciphertext) -> Self {
        c.0
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Envelope {
    nonce: [u8; NONCE_LEN],
    /// Ciphertext followed by the authentication tag.
    sealed: Vec<u8>,
}

impl Envelope {
    fn encode(&self) -> Ciphertext {
        Ciphertext(format!(
            "{}.{}.{}",
            VERSION_PREFIX,
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.sealed),
        ))
    }

    fn parse(s: &str) -> Result<Self, DecryptError> {
        let parts: Vec<&str> = s.splitn(3, '.').collect();
        if parts.len() != 3 || parts[0] != VERSION_PREFIX {
            return Err(DecryptError::InvalidFormat);
        }
        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| DecryptError::InvalidFormat)?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| DecryptError::InvalidFormat)?;

        let sealed = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| DecryptError::InvalidFormat)?;
        if sealed.len() < TAG_LEN {
            return Err(DecryptError::InvalidFormat);
        }

        Ok(Self { nonce, sealed })
    }
}

/// Returns `true` if `s` is a structurally valid envelope of the current version.
///
/// Says nothing about which key produced it.
pub fn is_envelope(s: &str) -> bool {
    Envelope::parse(s).is_ok()
}

/// Errors produced while encrypting a field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncryptError {
    /// The plaintext is longer than [`MAX_FIELD_CHARS`].
    #[error("field is {len} characters long; at most {MAX_FIELD_CHARS} are allowed")]
    FieldTooLong { len: usize },

    /// AES-GCM-SIV encryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Errors produced while decrypting a field.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    /// The input is not a parseable `v1` envelope.
    #[error("invalid encrypted field format")]
    InvalidFormat,

    /// The envelope parsed but failed authentication (wrong key, tampering)
    /// or the recovered bytes are not UTF-8.
    #[error("encrypted field failed authentication")]
    AuthenticationOrPadding,
}

impl DecryptError {
    /// Short machine-readable reason reported to callers.
    pub fn reason(&self) -> &'static str {
        match self {
            DecryptError::InvalidFormat => "invalid_format",
            DecryptError::AuthenticationOrPadding => "authentication_failed",
        }
    }
}

/// Reject plaintext longer than [`MAX_FIELD_CHARS`].
///
/// # Errors
///
/// Returns [`EncryptError::FieldTooLong`] with the observed length.
pub fn check_field_len(plaintext: &str) -> Result<(), EncryptError> {
    let len = plaintext.chars().count();
    if len > MAX_FIELD_CHARS {
        return Err(EncryptError::FieldTooLong { len });
    }
    Ok(())
}

/// Encrypt a plaintext string field with a nonce drawn from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`EncryptError::FieldTooLong`] if the input exceeds [`MAX_FIELD_CHARS`].
/// Returns [`EncryptError::AeadFailure`] on an internal AEAD error (unreachable
/// with a valid key and nonce).
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<Ciphertext, EncryptError> {
    encrypt_with_rng(plaintext, key, &mut OsRng)
}

/// Encrypt a plaintext string field, drawing the nonce from `rng`.
///
/// # Errors
///
/// Same as [`encrypt`].
pub fn encrypt_with_rng<R>(
    plaintext: &str,
    key: &EncryptionKey,
    rng: &mut R,
) -> Result<Ciphertext, EncryptError>
where
    R: RngCore + CryptoRng,
{
    check_field_len(plaintext)?;

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let sealed = build_cipher(key)
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| EncryptError::AeadFailure)?;

    Ok(Envelope { nonce, sealed }.encode())
}

/// Decrypt an envelope string back to its plaintext.
///
/// # Errors
///
/// Returns [`DecryptError::InvalidFormat`] if `ciphertext` is not a `v1` envelope.
/// Returns [`DecryptError::AuthenticationOrPadding`] if authentication fails
/// (wrong key or tampered data) or the plaintext is not valid UTF-8.
pub fn decrypt(ciphertext: &str, key: &EncryptionKey) -> Result<String, DecryptError> {
    let envelope = Envelope::parse(ciphertext)?;
    let bytes = build_cipher(key)
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.sealed.as_ref())
        .map_err(|_| DecryptError::AuthenticationOrPadding)?;
    String::from_utf8(bytes).map_err(|_| DecryptError::AuthenticationOrPadding)
}

fn build_cipher(key: &EncryptionKey) -> Aes256GcmSiv {
    Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(&key.as_bytes()[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm_siv::aead::rand_core;

    fn random_key() -> EncryptionKey {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        EncryptionKey::from_bytes(key)
    }

    /// Deterministic RNG for reproducing a specific nonce.
    struct FixedRng(u8);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            u32::from(self.0)
        }
        fn next_u64(&mut self) -> u64 {
            u64::from(self.0)
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(self.0);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for FixedRng {}

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = random_key();
        let samples = [
            String::new(),
            "4111111111111111".to_string(),
            "12/29".to_string(),
            "123".to_string(),
            "Crédit Agricole — carte bleue".to_string(),
            "x".repeat(MAX_FIELD_CHARS),
            "é".repeat(MAX_FIELD_CHARS),
        ];
        for s in &samples {
            let ct = encrypt(s, &key).unwrap();
            assert_eq!(&decrypt(ct.as_str(), &key).unwrap(), s);
        }
    }

    #[test]
    fn repeated_encryption_is_unlinkable() {
        let key = random_key();
        let a = encrypt("4111111111111111", &key).unwrap();
        let b = encrypt("4111111111111111", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn injected_rng_controls_nonce() {
        let key = random_key();
        let a = encrypt_with_rng("123", &key, &mut FixedRng(7)).unwrap();
        let b = encrypt_with_rng("123", &key, &mut FixedRng(7)).unwrap();
        let c = encrypt_with_rng("123", &key, &mut FixedRng(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        let expected_nonce = URL_SAFE_NO_PAD.encode([7u8; NONCE_LEN]);
        assert!(a.as_str().starts_with(&format!("v1.{expected_nonce}.")));
    }

    #[test]
    fn wrong_key_fails_decryption() {
        for _ in 0..200 {
            let k1 = random_key();
            let k2 = random_key();
            let ct = encrypt("123", &k1).unwrap();
            assert_eq!(
                decrypt(ct.as_str(), &k2),
                Err(DecryptError::AuthenticationOrPadding)
            );
        }
    }

    #[test]
    fn over_length_input_rejected() {
        let key = random_key();
        let too_long = "9".repeat(MAX_FIELD_CHARS + 1);
        assert_eq!(
            encrypt(&too_long, &key),
            Err(EncryptError::FieldTooLong {
                len: MAX_FIELD_CHARS + 1
            })
        );
    }

    #[test]
    fn envelope_has_version_prefix() {
        let key = random_key();
        let ct = encrypt("hello", &key).unwrap();
        assert!(ct.as_str().starts_with("v1."));
        assert!(is_envelope(ct.as_str()));
    }

    #[test]
    fn non_envelope_is_invalid_format() {
        let key = random_key();
        assert_eq!(
            decrypt("not-a-cipher-envelope", &key),
            Err(DecryptError::InvalidFormat)
        );
        assert!(!is_envelope("4111111111111111"));
    }

    #[test]
    fn parse_rejects_bad_prefix() {
        assert_eq!(Envelope::parse("v2.abc.def"), Err(DecryptError::InvalidFormat));
    }

    #[test]
    fn parse_rejects_too_few_parts() {
        assert_eq!(Envelope::parse("v1.abc"), Err(DecryptError::InvalidFormat));
    }

    #[test]
    fn parse_rejects_bad_base64() {
        assert_eq!(Envelope::parse("v1.!!!.abc"), Err(DecryptError::InvalidFormat));
    }

    #[test]
    fn parse_rejects_short_nonce() {
        let s = format!(
            "v1.{}.{}",
            URL_SAFE_NO_PAD.encode([0u8; 8]),
            URL_SAFE_NO_PAD.encode([0u8; 32])
        );
        assert_eq!(Envelope::parse(&s), Err(DecryptError::InvalidFormat));
    }

    #[test]
    fn parse_rejects_missing_tag() {
        let s = format!(
            "v1.{}.{}",
            URL_SAFE_NO_PAD.encode([0u8; NONCE_LEN]),
            URL_SAFE_NO_PAD.encode([0u8; 4])
        );
        assert_eq!(Envelope::parse(&s), Err(DecryptError::InvalidFormat));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = random_key();
        let ct = encrypt("tamper me", &key).unwrap();
        let mut envelope = Envelope::parse(ct.as_str()).unwrap();
        envelope.sealed[0] ^= 0xFF;
        let tampered = envelope.encode();
        assert_eq!(
            decrypt(tampered.as_str(), &key),
            Err(DecryptError::AuthenticationOrPadding)
        );
    }

    #[test]
    fn non_utf8_plaintext_is_reported_as_auth_failure() {
        let key = random_key();
        let nonce = [3u8; NONCE_LEN];
        let sealed = build_cipher(&key)
            .encrypt(Nonce::from_slice(&nonce), &[0xFF, 0xFE, 0xFD][..])
            .unwrap();
        let ct = Envelope { nonce, sealed }.encode();
        assert_eq!(
            decrypt(ct.as_str(), &key),
            Err(DecryptError::AuthenticationOrPadding)
        );
    }

    #[test]
    fn key_debug_is_redacted() {
        let key = EncryptionKey::from_bytes([0xAB; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "EncryptionKey([REDACTED])");
    }
}
