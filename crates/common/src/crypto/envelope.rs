//! Sealing payloads into a self-describing envelope
//!
//! The ciphertext travels as the record body while the parameters needed to
//! open it ride in the record's tag map:
//!
//! ```text
//! body: AES-256-GCM(key, nonce, plaintext) || tag (16 bytes)
//! tags: Cipher = AES256-GCM
//!       Cipher-IV = base64url(nonce)
//!       Content-Type = application/octet-stream
//! ```
//!
//! The nonce is never prefixed to the ciphertext.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::secret::Secret;
use crate::entity::tags::{EntityTag, TagMap};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Content type of sealed payloads
pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("unsupported cipher: {0:?}")]
    UnsupportedCipher(Option<String>),
    #[error("cipher requires a Cipher-IV tag")]
    MissingNonce,
    /// Wrong key, wrong nonce, or modified ciphertext. Deliberately carries
    /// no detail about which.
    #[error("payload failed authentication")]
    AuthenticationFailure,
    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// Authenticated-encryption algorithms an envelope can be sealed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Cipher {
    #[default]
    #[serde(rename = "AES256-GCM")]
    Aes256Gcm,
}

impl Cipher {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cipher::Aes256Gcm => "AES256-GCM",
        }
    }

    pub fn nonce_size(&self) -> usize {
        match self {
            Cipher::Aes256Gcm => NONCE_SIZE,
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cipher {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES256-GCM" => Ok(Cipher::Aes256Gcm),
            other => Err(EnvelopeError::UnsupportedCipher(Some(other.to_string()))),
        }
    }
}

/// A sealed payload and the tags required to open it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    pub tags: TagMap,
}

/// Encrypt `plaintext` under `key` with a fresh random nonce
///
/// Returns a new tag map holding `Cipher`, `Cipher-IV` and `Content-Type`;
/// nothing the caller owns is modified.
///
/// # Errors
///
/// Returns [`EnvelopeError::Encrypt`] only on RNG failure or if the
/// plaintext exceeds the AEAD's length limit.
pub fn seal(plaintext: &[u8], key: &Secret, cipher: Cipher) -> Result<Envelope, EnvelopeError> {
    let (ciphertext, nonce) = match cipher {
        Cipher::Aes256Gcm => {
            let mut nonce_bytes = [0u8; NONCE_SIZE];
            getrandom::getrandom(&mut nonce_bytes)
                .map_err(|e| EnvelopeError::Encrypt(format!("failed to generate nonce: {}", e)))?;

            let aead = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
            let ciphertext = aead
                .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
                .map_err(|_| EnvelopeError::Encrypt("aead encrypt error".to_string()))?;
            (ciphertext, nonce_bytes.to_vec())
        }
    };

    tracing::debug!(
        cipher = %cipher,
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "sealed payload"
    );

    let mut tags = TagMap::new();
    tags.insert(EntityTag::Cipher, cipher.as_str());
    tags.insert(EntityTag::CipherIv, URL_SAFE_NO_PAD.encode(nonce));
    tags.insert(EntityTag::ContentType, OCTET_STREAM);

    Ok(Envelope { ciphertext, tags })
}

/// Decrypt a payload using the cipher parameters found in `tags`
///
/// # Errors
///
/// - [`EnvelopeError::UnsupportedCipher`] if `Cipher` is absent or unknown
/// - [`EnvelopeError::MissingNonce`] if `Cipher-IV` is absent
/// - [`EnvelopeError::AuthenticationFailure`] if the payload does not verify
///   under `key`, including when the nonce tag is malformed
pub fn open(ciphertext: &[u8], tags: &TagMap, key: &Secret) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = match tags.get(EntityTag::Cipher) {
        Some(name) => name.parse::<Cipher>()?,
        None => return Err(EnvelopeError::UnsupportedCipher(None)),
    };

    let iv = tags.get(EntityTag::CipherIv).ok_or(EnvelopeError::MissingNonce)?;

    // Padded, non-base64url or wrong-length nonces still go through the
    // AEAD under a zero nonce so they fail the same way a wrong one does
    let nonce = URL_SAFE_NO_PAD
        .decode(iv)
        .ok()
        .filter(|nonce| nonce.len() == cipher.nonce_size());
    let well_formed = nonce.is_some();
    let nonce = nonce.unwrap_or_else(|| vec![0u8; cipher.nonce_size()]);

    let opened = match cipher {
        Cipher::Aes256Gcm => {
            let aead = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
            aead.decrypt(Nonce::from_slice(&nonce), ciphertext)
        }
    };
    let plaintext = match opened {
        Ok(plaintext) if well_formed => plaintext,
        _ => return Err(EnvelopeError::AuthenticationFailure),
    };

    tracing::debug!(cipher = %cipher, plaintext_len = plaintext.len(), "opened payload");
    Ok(plaintext)
}

#[cfg(test)]
mod test {
    use super::*;

    fn flip_nonce_bit(tags: &TagMap, bit: usize) -> TagMap {
        let mut nonce = URL_SAFE_NO_PAD
            .decode(tags.get(EntityTag::CipherIv).unwrap())
            .unwrap();
        nonce[bit / 8] ^= 1 << (bit % 8);
        let mut tampered = tags.clone();
        tampered.insert(EntityTag::CipherIv, URL_SAFE_NO_PAD.encode(nonce));
        tampered
    }

    #[test]
    fn test_seal_open() {
        let key = Secret::generate();
        let data = b"{\"name\":\"My Drive\"}";

        let envelope = seal(data, &key, Cipher::Aes256Gcm).unwrap();
        assert_eq!(envelope.ciphertext.len(), data.len() + TAG_SIZE);
        assert_eq!(envelope.tags.get(EntityTag::Cipher), Some("AES256-GCM"));
        assert_eq!(envelope.tags.get(EntityTag::ContentType), Some(OCTET_STREAM));
        assert_eq!(envelope.tags.get(EntityTag::CipherIv).unwrap().len(), 16);

        let opened = open(&envelope.ciphertext, &envelope.tags, &key).unwrap();
        assert_eq!(opened, data.to_vec());
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let key = Secret::generate();
        let a = seal(b"same", &key, Cipher::Aes256Gcm).unwrap();
        let b = seal(b"same", &key, Cipher::Aes256Gcm).unwrap();
        assert_ne!(a.tags.get(EntityTag::CipherIv), b.tags.get(EntityTag::CipherIv));
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = Secret::generate();
        let envelope = seal(b"", &key, Cipher::Aes256Gcm).unwrap();
        assert_eq!(envelope.ciphertext.len(), TAG_SIZE);
        assert!(open(&envelope.ciphertext, &envelope.tags, &key).unwrap().is_empty());
    }

    #[test]
    fn test_every_ciphertext_bit_flip_fails() {
        let key = Secret::generate();
        let envelope = seal(b"tamper me", &key, Cipher::Aes256Gcm).unwrap();

        for bit in 0..envelope.ciphertext.len() * 8 {
            let mut tampered = envelope.ciphertext.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            assert!(matches!(
                open(&tampered, &envelope.tags, &key),
                Err(EnvelopeError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn test_every_nonce_bit_flip_fails() {
        let key = Secret::generate();
        let envelope = seal(b"tamper me", &key, Cipher::Aes256Gcm).unwrap();

        for bit in 0..NONCE_SIZE * 8 {
            let tags = flip_nonce_bit(&envelope.tags, bit);
            assert!(matches!(
                open(&envelope.ciphertext, &tags, &key),
                Err(EnvelopeError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope = seal(b"secret", &Secret::generate(), Cipher::Aes256Gcm).unwrap();
        assert!(matches!(
            open(&envelope.ciphertext, &envelope.tags, &Secret::generate()),
            Err(EnvelopeError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_malformed_nonce_fails_authentication() {
        let key = Secret::generate();
        let envelope = seal(b"secret", &key, Cipher::Aes256Gcm).unwrap();

        for iv in ["", "!!!!", "AAAA"] {
            let mut tags = envelope.tags.clone();
            tags.insert(EntityTag::CipherIv, iv);
            assert!(matches!(
                open(&envelope.ciphertext, &tags, &key),
                Err(EnvelopeError::AuthenticationFailure)
            ));
        }
    }

    #[test]
    fn test_padded_nonce_is_rejected() {
        let key = Secret::generate();
        let envelope = seal(b"secret", &key, Cipher::Aes256Gcm).unwrap();
        let iv = envelope.tags.get(EntityTag::CipherIv).unwrap();

        let mut tags = envelope.tags.clone();
        tags.insert(EntityTag::CipherIv, format!("{}==", iv));
        assert!(matches!(
            open(&envelope.ciphertext, &tags, &key),
            Err(EnvelopeError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_malformed_nonce_never_opens_zero_nonce_payload() {
        let key = Secret::generate();
        let aead = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
        let ciphertext = aead
            .encrypt(Nonce::from_slice(&[0u8; NONCE_SIZE]), b"secret".as_ref())
            .unwrap();

        let mut tags = TagMap::new();
        tags.insert(EntityTag::Cipher, Cipher::Aes256Gcm.as_str());
        tags.insert(EntityTag::CipherIv, "not a nonce");
        assert!(matches!(
            open(&ciphertext, &tags, &key),
            Err(EnvelopeError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_missing_or_unknown_cipher() {
        let key = Secret::generate();
        let envelope = seal(b"secret", &key, Cipher::Aes256Gcm).unwrap();

        let mut tags = envelope.tags.clone();
        tags.remove(EntityTag::Cipher);
        assert!(matches!(
            open(&envelope.ciphertext, &tags, &key),
            Err(EnvelopeError::UnsupportedCipher(None))
        ));

        tags.insert(EntityTag::Cipher, "ROT13");
        assert!(matches!(
            open(&envelope.ciphertext, &tags, &key),
            Err(EnvelopeError::UnsupportedCipher(Some(name))) if name == "ROT13"
        ));
    }

    #[test]
    fn test_missing_nonce() {
        let key = Secret::generate();
        let envelope = seal(b"secret", &key, Cipher::Aes256Gcm).unwrap();

        let mut tags = envelope.tags.clone();
        tags.remove(EntityTag::CipherIv);
        assert!(matches!(
            open(&envelope.ciphertext, &tags, &key),
            Err(EnvelopeError::MissingNonce)
        ));
    }

    #[test]
    fn test_cipher_names() {
        assert_eq!("AES256-GCM".parse::<Cipher>().unwrap(), Cipher::Aes256Gcm);
        assert_eq!(Cipher::Aes256Gcm.to_string(), "AES256-GCM");
        assert_eq!(
            serde_json::to_string(&Cipher::Aes256Gcm).unwrap(),
            "\"AES256-GCM\""
        );
    }
}
