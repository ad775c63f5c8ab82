//! Drive and file key derivation
//!
//! ```text
//! wallet ──sign("drive" || driveId)──> signature
//!                                          │ HKDF-SHA256(info = passphrase)
//!                                          ▼
//!                                      DriveKey ──HKDF-SHA256(info = fileId)──> FileKey
//! ```
//!
//! Both stages use an empty salt and expand to 256 bits. Nothing here is
//! cached: callers re-derive on every seal/open.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;
use zeroize::Zeroize;

use super::keys::{KeyError, WalletSigner};
use super::secret::{DriveKey, FileKey, SECRET_SIZE};

/// Message prefix signed by the wallet to seed a drive key
pub const DRIVE_KEY_PREFIX: &[u8] = b"drive";

/// How a private drive's key is unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveAuthMode {
    Password,
}

impl DriveAuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveAuthMode::Password => "password",
        }
    }
}

impl fmt::Display for DriveAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveAuthMode {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(DriveAuthMode::Password),
            other => Err(KeyError::UnsupportedAuthMode(other.to_string())),
        }
    }
}

/// The parameters of a drive auth mode
#[derive(Clone, PartialEq, Eq)]
pub enum DriveAuthParams {
    Password { passphrase: String },
}

impl fmt::Debug for DriveAuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveAuthParams::Password { .. } => f.write_str("Password { .. }"),
        }
    }
}

impl Drop for DriveAuthParams {
    fn drop(&mut self) {
        match self {
            DriveAuthParams::Password { passphrase } => passphrase.zeroize(),
        }
    }
}

impl DriveAuthParams {
    pub fn password(passphrase: impl Into<String>) -> Self {
        DriveAuthParams::Password {
            passphrase: passphrase.into(),
        }
    }

    /// Build the params for a mode given by name, as read from a
    /// `Drive-Auth-Mode` tag or user input
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::UnsupportedAuthMode`] if the mode is not known.
    pub fn from_name(name: &str, secret: impl Into<String>) -> Result<Self, KeyError> {
        match name.parse::<DriveAuthMode>()? {
            DriveAuthMode::Password => Ok(Self::password(secret)),
        }
    }

    pub fn mode(&self) -> DriveAuthMode {
        match self {
            DriveAuthParams::Password { .. } => DriveAuthMode::Password,
        }
    }

    fn info(&self) -> &[u8] {
        match self {
            DriveAuthParams::Password { passphrase } => passphrase.as_bytes(),
        }
    }
}

/// Anything that can name a drive or file for key derivation
pub trait EntityIdRef {
    fn entity_uuid(&self) -> Result<Uuid, KeyError>;
}

impl EntityIdRef for Uuid {
    fn entity_uuid(&self) -> Result<Uuid, KeyError> {
        Ok(*self)
    }
}

impl EntityIdRef for str {
    fn entity_uuid(&self) -> Result<Uuid, KeyError> {
        parse_entity_id(self).ok_or_else(|| KeyError::InvalidIdentifier(self.to_string()))
    }
}

impl EntityIdRef for String {
    fn entity_uuid(&self) -> Result<Uuid, KeyError> {
        self.as_str().entity_uuid()
    }
}

impl<T: EntityIdRef + ?Sized> EntityIdRef for &T {
    fn entity_uuid(&self) -> Result<Uuid, KeyError> {
        (**self).entity_uuid()
    }
}

/// Parse an identifier in canonical hyphenated form
///
/// Other textual UUID forms (simple, braced, urn) are rejected.
pub fn parse_entity_id(value: &str) -> Option<Uuid> {
    if value.len() != 36 {
        return None;
    }
    Uuid::try_parse(value).ok()
}

/// A signer whose signing happens behind an asynchronous boundary, e.g. a
/// hardware or browser wallet
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    async fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError>;
}

#[async_trait]
impl<W: WalletSigner> RemoteSigner for W {
    async fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError> {
        WalletSigner::sign(self, msg)
    }
}

fn drive_key_message(drive_id: Uuid) -> Vec<u8> {
    let mut msg = Vec::with_capacity(DRIVE_KEY_PREFIX.len() + 16);
    msg.extend_from_slice(DRIVE_KEY_PREFIX);
    msg.extend_from_slice(drive_id.as_bytes());
    msg
}

fn expand(ikm: &[u8], info: &[u8]) -> Result<[u8; SECRET_SIZE], KeyError> {
    let hk = Hkdf::<Sha256>::new(None, ikm);
    let mut okm = [0u8; SECRET_SIZE];
    hk.expand(info, &mut okm)
        .map_err(|e| KeyError::KeyImport(format!("hkdf expand failed: {}", e)))?;
    Ok(okm)
}

fn drive_key_from_signature(
    mut signature: Vec<u8>,
    mode: &DriveAuthParams,
) -> Result<DriveKey, KeyError> {
    if signature.is_empty() {
        return Err(KeyError::KeyImport("wallet produced an empty signature".into()));
    }
    let okm = expand(&signature, mode.info());
    signature.zeroize();
    Ok(DriveKey::from(okm?))
}

/// Derive the key of a drive for the given wallet
///
/// # Errors
///
/// - [`KeyError::InvalidIdentifier`] if `drive_id` is not a well-formed id
/// - [`KeyError::KeyImport`] if the signature cannot be used as key material
/// - [`KeyError::Signer`] if the wallet fails to sign
pub fn derive_drive_key(
    drive_id: impl EntityIdRef,
    wallet: &dyn WalletSigner,
    mode: &DriveAuthParams,
) -> Result<DriveKey, KeyError> {
    let drive_id = drive_id.entity_uuid()?;
    tracing::debug!(%drive_id, mode = %mode.mode(), "deriving drive key");

    let signature = wallet.sign(&drive_key_message(drive_id))?;
    drive_key_from_signature(signature, mode)
}

/// Derive the key of a drive with a remote signer
///
/// Identical output to [`derive_drive_key`] for the same wallet. No retry
/// or timeout is applied to the signer.
pub async fn derive_drive_key_remote(
    drive_id: impl EntityIdRef,
    signer: &dyn RemoteSigner,
    mode: &DriveAuthParams,
) -> Result<DriveKey, KeyError> {
    let drive_id = drive_id.entity_uuid()?;
    tracing::debug!(%drive_id, mode = %mode.mode(), "deriving drive key with remote signer");

    let signature = signer.sign(&drive_key_message(drive_id)).await?;
    drive_key_from_signature(signature, mode)
}

/// Derive the key of a file from its drive key
///
/// # Errors
///
/// Returns [`KeyError::InvalidIdentifier`] if `file_id` is not a well-formed id.
pub fn derive_file_key(drive_key: &DriveKey, file_id: impl EntityIdRef) -> Result<FileKey, KeyError> {
    let file_id = file_id.entity_uuid()?;
    tracing::trace!(%file_id, "deriving file key");

    let okm = expand(drive_key.bytes(), file_id.as_bytes())?;
    Ok(FileKey::from(okm))
}
