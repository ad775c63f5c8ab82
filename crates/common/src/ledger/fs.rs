use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::provider::{FetchedRecord, LedgerError, LedgerProvider};
use super::TransactionId;
use crate::entity::{EntityRecord, TagMap};

/// Ledger provider that keeps one JSON file per transaction in a directory
#[derive(Debug, Clone)]
pub struct FsLedgerProvider {
    dir: PathBuf,
    owner_address: String,
}

#[derive(thiserror::Error, Debug)]
pub enum FsLedgerProviderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt record data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to generate transaction salt: {0}")]
    Rng(String),
}

/// On-disk form of a record
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    /// base64url, unpadded
    data: String,
    tags: TagMap,
    owner_address: String,
}

impl FsLedgerProvider {
    /// Open a ledger directory, creating it if needed
    pub async fn open(
        dir: impl AsRef<Path>,
        owner_address: impl Into<String>,
    ) -> Result<Self, FsLedgerProviderError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            owner_address: owner_address.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &TransactionId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl LedgerProvider for FsLedgerProvider {
    type Error = FsLedgerProviderError;

    fn owner_address(&self) -> String {
        self.owner_address.clone()
    }

    async fn submit_record(
        &self,
        record: EntityRecord,
    ) -> Result<TransactionId, LedgerError<Self::Error>> {
        let mut salt = [0u8; 16];
        getrandom::getrandom(&mut salt)
            .map_err(|e| FsLedgerProviderError::Rng(e.to_string()))?;
        let id = TransactionId::derive(&salt, &record);

        let stored = StoredRecord {
            data: URL_SAFE_NO_PAD.encode(&record.data),
            tags: record.tags,
            owner_address: self.owner_address.clone(),
        };
        let json = serde_json::to_vec_pretty(&stored).map_err(FsLedgerProviderError::from)?;
        tokio::fs::write(self.record_path(&id), json)
            .await
            .map_err(FsLedgerProviderError::from)?;

        tracing::debug!(%id, dir = %self.dir.display(), "stored record");
        Ok(id)
    }

    async fn fetch_record(
        &self,
        id: &TransactionId,
    ) -> Result<FetchedRecord, LedgerError<Self::Error>> {
        // ids double as file names, so anything else never names a record
        if !id.is_well_formed() {
            return Err(LedgerError::NotFound(id.clone()));
        }

        let json = match tokio::fs::read(self.record_path(id)).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LedgerError::NotFound(id.clone()))
            }
            Err(e) => return Err(FsLedgerProviderError::from(e).into()),
        };
        let stored: StoredRecord =
            serde_json::from_slice(&json).map_err(FsLedgerProviderError::from)?;
        let data = URL_SAFE_NO_PAD
            .decode(stored.data.as_bytes())
            .map_err(FsLedgerProviderError::from)?;

        Ok(FetchedRecord {
            data,
            tags: stored.tags,
            owner_address: stored.owner_address,
        })
    }
}
