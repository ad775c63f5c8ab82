//! Cryptographic primitives for ArFS entities
//!
//! - **Wallets**: RSA (JWK) and Ed25519 wallets that sign deterministically
//!   and publish a SHA-256 address of their public key
//! - **Key hierarchy**: a wallet signature over `"drive" || driveId` is
//!   expanded with HKDF-SHA256 into a [`DriveKey`]; every [`FileKey`] is an
//!   HKDF expansion of its drive key and file id
//! - **Envelope**: AES-256-GCM with a fresh 96-bit nonce per seal, the nonce
//!   carried out-of-band in the `Cipher-IV` tag
//!
//! # Key lifetime
//!
//! Keys are never persisted. A reader re-derives the drive key from their
//! wallet and passphrase, and a file key from the drive key, for every
//! operation. Key bytes are zeroized on drop and redacted from `Debug`.

mod envelope;
mod kdf;
mod keys;
mod secret;

pub use envelope::{
    open, seal, Cipher, Envelope, EnvelopeError, NONCE_SIZE, OCTET_STREAM, TAG_SIZE,
};
pub use kdf::{
    derive_drive_key, derive_drive_key_remote, derive_file_key, parse_entity_id, DriveAuthMode,
    DriveAuthParams, EntityIdRef, RemoteSigner, DRIVE_KEY_PREFIX,
};
pub use keys::{
    owner_to_address, Ed25519Wallet, JwkWallet, KeyError, WalletSigner, PRIVATE_KEY_SIZE,
    PUBLIC_KEY_SIZE,
};
pub use secret::{DriveKey, FileKey, Secret, SecretError, SECRET_SIZE};
