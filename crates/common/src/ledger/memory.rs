use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::provider::{FetchedRecord, LedgerError, LedgerProvider};
use super::TransactionId;
use crate::entity::EntityRecord;

/// In-memory ledger provider
#[derive(Debug, Clone)]
pub struct MemoryLedgerProvider {
    owner_address: String,
    inner: Arc<RwLock<MemoryLedgerProviderInner>>,
}

#[derive(Debug, Default)]
struct MemoryLedgerProviderInner {
    /// Number of records submitted so far, mixed into every id
    sequence: u64,
    records: HashMap<TransactionId, EntityRecord>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryLedgerProviderError {
    #[error("memory provider error: {0}")]
    Internal(String),
}

impl MemoryLedgerProvider {
    pub fn new(owner_address: impl Into<String>) -> Self {
        Self {
            owner_address: owner_address.into(),
            inner: Arc::new(RwLock::new(MemoryLedgerProviderInner::default())),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LedgerProvider for MemoryLedgerProvider {
    type Error = MemoryLedgerProviderError;

    fn owner_address(&self) -> String {
        self.owner_address.clone()
    }

    async fn submit_record(
        &self,
        record: EntityRecord,
    ) -> Result<TransactionId, LedgerError<Self::Error>> {
        let mut inner = self.inner.write().map_err(|e| {
            LedgerError::Provider(MemoryLedgerProviderError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })?;

        let id = TransactionId::derive(&inner.sequence.to_be_bytes(), &record);
        inner.sequence += 1;
        inner.records.insert(id.clone(), record);

        Ok(id)
    }

    async fn fetch_record(
        &self,
        id: &TransactionId,
    ) -> Result<FetchedRecord, LedgerError<Self::Error>> {
        let inner = self.inner.read().map_err(|e| {
            LedgerError::Provider(MemoryLedgerProviderError::Internal(format!(
                "failed to acquire read lock: {}",
                e
            )))
        })?;

        let record = inner
            .records
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(id.clone()))?;

        Ok(FetchedRecord {
            data: record.data.clone(),
            tags: record.tags.clone(),
            owner_address: self.owner_address.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::TagMap;

    fn record(data: &[u8]) -> EntityRecord {
        EntityRecord {
            data: data.to_vec(),
            tags: [("Content-Type", "application/json")].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_submit_fetch() {
        let provider = MemoryLedgerProvider::new("owner");
        let id = provider.submit_record(record(b"{}")).await.unwrap();
        assert_eq!(id.as_str().len(), 43);

        let fetched = provider.fetch_record(&id).await.unwrap();
        assert_eq!(fetched.data, b"{}".to_vec());
        assert_eq!(fetched.tags.get("Content-Type"), Some("application/json"));
        assert_eq!(fetched.owner_address, "owner");
        assert!(provider.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_record_gets_distinct_ids() {
        let provider = MemoryLedgerProvider::new("owner");
        let a = provider.submit_record(record(b"same")).await.unwrap();
        let b = provider.submit_record(record(b"same")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(provider.len(), 2);
    }

    #[tokio::test]
    async fn test_not_found() {
        let provider = MemoryLedgerProvider::new("owner");
        let missing = TransactionId::from("x".repeat(43));
        assert!(matches!(
            provider.fetch_record(&missing).await,
            Err(LedgerError::NotFound(id)) if id == missing
        ));
        assert!(!provider.exists(&missing).await.unwrap());
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let provider = MemoryLedgerProvider::new("owner");
        let clone = provider.clone();
        let id = clone
            .submit_record(EntityRecord {
                data: vec![],
                tags: TagMap::new(),
            })
            .await
            .unwrap();
        assert!(provider.fetch_record(&id).await.is_ok());
    }
}
