pub mod address;
pub mod drive_key;
pub mod file_key;
pub mod get;
pub mod init;
pub mod put;
pub mod version;

pub use address::Address;
pub use drive_key::DriveKeyOp;
pub use file_key::FileKeyOp;
pub use get::Get;
pub use init::Init;
pub use put::Put;
pub use version::Version;

use common::crypto::{
    derive_drive_key, parse_entity_id, DriveAuthParams, DriveKey, KeyError, WalletSigner,
};
use uuid::Uuid;

/// Clap value parser for entity ids in canonical hyphenated form
pub fn parse_id(value: &str) -> Result<Uuid, String> {
    parse_entity_id(value).ok_or_else(|| format!("{:?} is not a canonical entity id", value))
}

/// Derive the drive key for a password-protected drive
pub fn password_drive_key(
    wallet: &dyn WalletSigner,
    drive_id: Uuid,
    password: &str,
) -> Result<DriveKey, KeyError> {
    derive_drive_key(drive_id, wallet, &DriveAuthParams::password(password))
}
