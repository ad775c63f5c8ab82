/**
 * Key derivation, wallets and the
 *  sealed envelope entities travel in.
 */
pub mod crypto;
/**
 * Drive, folder and file entities, their
 *  canonical payloads and the tag map
 *  projection that rides beside them.
 */
pub mod entity;
/**
 * The external ledger contract and the
 *  providers that implement it, plus
 *  write/read glue over the entity codec.
 */
pub mod ledger;

pub mod prelude {
    pub use crate::crypto::{
        derive_drive_key, derive_file_key, Cipher, DriveAuthMode, DriveAuthParams, DriveKey,
        Ed25519Wallet, FileKey, JwkWallet, KeyError, WalletSigner,
    };
    pub use crate::entity::{
        decode, encode, Drive, DrivePrivacy, Entity, EntityData, EntityError, EntityRecord,
        EntityType, File, Folder, Sealing, TagMap,
    };
    pub use crate::ledger::{
        read_entity, write_entity, FsLedgerProvider, LedgerProvider, MemoryLedgerProvider,
        TransactionId,
    };
}
