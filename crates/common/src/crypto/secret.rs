//! Symmetric key material for entity encryption
//!
//! A [`Secret`] is 256 bits of AES-256-GCM key material. It is never stored
//! or transmitted by this crate: drive keys are re-derived from a wallet
//! signature and file keys from their drive key every time they are needed.
//!
//! [`DriveKey`] and [`FileKey`] wrap a [`Secret`] so the two tiers of the
//! hierarchy cannot be confused at call sites.

use std::fmt;
use std::ops::Deref;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an AES-256-GCM key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;

/// Errors that can occur when importing raw key material
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("invalid secret size, expected {expected}, got {got}")]
    InvalidSize { expected: usize, got: usize },
    #[error("secret is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to generate random bytes: {0}")]
    Rng(#[from] getrandom::Error),
}

/// A 256-bit symmetric key
///
/// The bytes are wiped when the value is dropped and are redacted from
/// `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Self {
        Self::try_generate().expect("failed to generate random bytes")
    }

    /// Like [`Secret::generate`], but reports an unavailable RNG
    pub fn try_generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff)?;
        Ok(Self(buff))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(SecretError::InvalidSize {
                expected: SECRET_SIZE,
                got: data.len(),
            });
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Parse a secret from unpadded base64url, the encoding used by
    /// ArFS tooling to exchange raw keys
    pub fn from_b64url(encoded: &str) -> Result<Self, SecretError> {
        let mut bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('='))?;
        let secret = Self::from_slice(&bytes);
        bytes.zeroize();
        secret
    }

    /// Encode the raw key bytes as unpadded base64url
    pub fn to_b64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

macro_rules! key_tier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(Secret);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }

        impl Deref for $name {
            type Target = Secret;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<Secret> for $name {
            fn from(secret: Secret) -> Self {
                Self(secret)
            }
        }

        impl From<[u8; SECRET_SIZE]> for $name {
            fn from(bytes: [u8; SECRET_SIZE]) -> Self {
                Self(Secret::from(bytes))
            }
        }

        impl $name {
            /// Import raw key bytes
            pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
                Secret::from_slice(data).map(Self)
            }

            /// Import a key from unpadded base64url
            pub fn from_b64url(encoded: &str) -> Result<Self, SecretError> {
                Secret::from_b64url(encoded).map(Self)
            }

            /// Borrow the underlying symmetric key
            pub fn secret(&self) -> &Secret {
                &self.0
            }
        }
    };
}

key_tier!(
    /// Root symmetric key of one drive, scoped to one wallet
    ///
    /// Used directly to seal drive and folder entities, and as the input
    /// keying material for every [`FileKey`] in the drive.
    DriveKey
);

key_tier!(
    /// Symmetric key of one file, derived from its [`DriveKey`] and file id
    FileKey
);
