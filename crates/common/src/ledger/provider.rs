use std::fmt::{Debug, Display};

use async_trait::async_trait;

use super::TransactionId;
use crate::entity::{EntityRecord, TagMap};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError<T> {
    #[error("unhandled ledger provider error: {0}")]
    Provider(#[from] T),
    /// No record was ever submitted under this id
    #[error("transaction not found: {0}")]
    NotFound(TransactionId),
}

/// A record as returned by the ledger, with the address of its signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRecord {
    pub data: Vec<u8>,
    pub tags: TagMap,
    pub owner_address: String,
}

impl From<FetchedRecord> for EntityRecord {
    fn from(record: FetchedRecord) -> Self {
        EntityRecord {
            data: record.data,
            tags: record.tags,
        }
    }
}

/// An append-only store of records keyed by transaction id
///
/// Records are written once and never modified. Implementations must return
/// data byte-for-byte and tags verbatim as they were submitted.
#[async_trait]
pub trait LedgerProvider: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug;

    /// The address records submitted through this provider are attributed to
    fn owner_address(&self) -> String;

    /// Persist a record, returning the id it can be fetched under
    ///
    /// Submitting the same record twice yields two distinct transactions.
    async fn submit_record(
        &self,
        record: EntityRecord,
    ) -> Result<TransactionId, LedgerError<Self::Error>>;

    /// Fetch a record by id
    ///
    /// # Returns
    /// * `Ok(FetchedRecord)` - The record exactly as submitted
    /// * `Err(LedgerError::NotFound)` - No such transaction
    /// * `Err(LedgerError::Provider)` - The backing store failed
    async fn fetch_record(
        &self,
        id: &TransactionId,
    ) -> Result<FetchedRecord, LedgerError<Self::Error>>;

    async fn exists(&self, id: &TransactionId) -> Result<bool, LedgerError<Self::Error>> {
        match self.fetch_record(id).await {
            Ok(_) => Ok(true),
            Err(LedgerError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
