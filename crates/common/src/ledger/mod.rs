//! The ledger as seen by the entity codec
//!
//! The ledger is an external, append-only key-value store: records go in as
//! (data, tags) and come back out unchanged under a transaction id. This
//! module defines that contract ([`LedgerProvider`]), two providers used by
//! the CLI and tests, and the glue that writes and reads entities through
//! any provider.

use std::fmt::{self, Debug, Display};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

mod fs;
mod memory;
mod provider;

pub use fs::{FsLedgerProvider, FsLedgerProviderError};
pub use memory::{MemoryLedgerProvider, MemoryLedgerProviderError};
pub use provider::{FetchedRecord, LedgerError, LedgerProvider};

use crate::crypto::DriveKey;
use crate::entity::{decode, encode, Entity, EntityError, EntityRecord, EntityType, Sealing};

/// Length of a transaction id: base64url of a 256-bit digest
pub const TRANSACTION_ID_LEN: usize = 43;

/// Identity of a ledger record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Content-derived id: BLAKE3 over a per-submission salt, the record
    /// data and its tags
    pub fn derive(salt: &[u8], record: &EntityRecord) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(salt);
        hasher.update(&(record.data.len() as u64).to_be_bytes());
        hasher.update(&record.data);
        for (key, value) in record.tags.iter() {
            hasher.update(key.as_bytes());
            hasher.update(&[0]);
            hasher.update(value.as_bytes());
            hasher.update(&[0]);
        }
        Self(URL_SAFE_NO_PAD.encode(hasher.finalize().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this looks like an id a ledger could have issued
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == TRANSACTION_ID_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WriteError<T: Display + Debug> {
    #[error("entity error: {0}")]
    Entity(#[from] EntityError),
    #[error("ledger error: {0}")]
    Ledger(LedgerError<T>),
}

impl<T: Display + Debug> From<LedgerError<T>> for WriteError<T> {
    fn from(e: LedgerError<T>) -> Self {
        WriteError::Ledger(e)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReadError<T: Display + Debug> {
    #[error("entity error: {0}")]
    Entity(#[from] EntityError),
    #[error("ledger error: {0}")]
    Ledger(LedgerError<T>),
}

impl<T: Display + Debug> From<LedgerError<T>> for ReadError<T> {
    fn from(e: LedgerError<T>) -> Self {
        ReadError::Ledger(e)
    }
}

/// Encode an entity and submit it to the ledger
///
/// Returns the entity as written, with its transaction id and owner address
/// filled in.
pub async fn write_entity<P: LedgerProvider>(
    provider: &P,
    entity: &Entity,
    sealing: Sealing<'_>,
) -> Result<Entity, WriteError<P::Error>> {
    let record = encode(entity, sealing)?;
    let id = provider.submit_record(record).await?;

    tracing::debug!(
        %id,
        entity_id = %entity.id,
        kind = %entity.kind(),
        sealed = sealing.is_sealed(),
        "wrote entity"
    );
    Ok(entity
        .clone()
        .with_transaction(id, provider.owner_address()))
}

/// Fetch a record and decode it as an entity of the expected kind
pub async fn read_entity<P: LedgerProvider>(
    provider: &P,
    kind: EntityType,
    id: &TransactionId,
    drive_key: Option<&DriveKey>,
) -> Result<Entity, ReadError<P::Error>> {
    let fetched = provider.fetch_record(id).await?;
    let owner_address = fetched.owner_address.clone();
    let entity = decode(kind, &fetched.into(), drive_key)?;

    tracing::debug!(%id, entity_id = %entity.id, %kind, "read entity");
    Ok(entity.with_transaction(id.clone(), owner_address))
}
