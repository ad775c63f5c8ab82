use clap::Args;
use uuid::Uuid;

use common::crypto::{parse_entity_id, KeyError};
use common::entity::{EntityTag, EntityType};
use common::ledger::{
    read_entity, FsLedgerProviderError, LedgerError, LedgerProvider, ReadError, TransactionId,
};

use super::{parse_id, password_drive_key};
use crate::state::StateError;

/// Read an entity from the local ledger and print it as JSON
#[derive(Args, Debug, Clone)]
pub struct Get {
    /// One of drive, folder or file
    pub kind: EntityType,

    pub tx_id: String,

    /// Drive of a private entity; read from the record's Drive-Id tag when
    /// not given
    #[arg(long, value_parser = parse_id)]
    pub drive_id: Option<Uuid>,

    /// Password of a private drive
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key derivation failed: {0}")]
    Key(#[from] KeyError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError<FsLedgerProviderError>),
    #[error("read failed: {0}")]
    Read(#[from] ReadError<FsLedgerProviderError>),
    #[error("record names no drive; pass --drive-id")]
    UnknownDrive,
    #[error("failed to render entity: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Get {
    type Error = GetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let wallet = state.load_wallet()?;
        let ledger = state.ledger(wallet.address()).await?;
        let tx_id = TransactionId::from(self.tx_id.as_str());

        let drive_key = match &self.password {
            None => None,
            Some(password) => {
                let drive_id = match self.drive_id {
                    Some(drive_id) => drive_id,
                    None => {
                        let record = ledger.fetch_record(&tx_id).await?;
                        record
                            .tags
                            .get(EntityTag::DriveId)
                            .and_then(parse_entity_id)
                            .ok_or(GetError::UnknownDrive)?
                    }
                };
                Some(password_drive_key(wallet.as_ref(), drive_id, password)?)
            }
        };

        let entity = read_entity(&ledger, self.kind, &tx_id, drive_key.as_ref()).await?;
        Ok(serde_json::to_string_pretty(&entity)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::op::{Op, OpContext};
    use crate::ops::put::{Put, PutDrive, PutEntity, PutFile};
    use crate::ops::Init;
    use serde_json::Value;
    use tempfile::TempDir;

    const PASSWORD: &str = "hunter2";

    async fn setup() -> (TempDir, OpContext) {
        let temp_dir = TempDir::new().unwrap();
        let ctx = OpContext::new(Some(temp_dir.path().join("arfs")));
        Init {
            log_level: "info".to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();
        (temp_dir, ctx)
    }

    /// Parse the `<kind> <id> tx <tx_id>` lines printed by `put`
    fn written(output: &str) -> Vec<(String, Uuid, String)> {
        output
            .lines()
            .map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                assert_eq!(parts.len(), 4, "unexpected put output {:?}", line);
                (
                    parts[0].to_string(),
                    parts[1].parse().unwrap(),
                    parts[3].to_string(),
                )
            })
            .collect()
    }

    async fn put(ctx: &OpContext, entity: PutEntity) -> Vec<(String, Uuid, String)> {
        written(&Put { entity }.execute(ctx).await.unwrap())
    }

    async fn put_drive(ctx: &OpContext, password: Option<&str>) -> Vec<(String, Uuid, String)> {
        put(
            ctx,
            PutEntity::Drive(PutDrive {
                name: "Photos".to_string(),
                drive_id: None,
                root_folder_name: None,
                password: password.map(String::from),
            }),
        )
        .await
    }

    async fn get(
        ctx: &OpContext,
        kind: EntityType,
        tx_id: &str,
        drive_id: Option<Uuid>,
        password: Option<&str>,
    ) -> Result<Value, GetError> {
        let output = Get {
            kind,
            tx_id: tx_id.to_string(),
            drive_id,
            password: password.map(String::from),
        }
        .execute(ctx)
        .await?;
        Ok(serde_json::from_str(&output).unwrap())
    }

    fn stored_tags(ctx: &OpContext, tx_id: &str) -> Value {
        let state = ctx.state().unwrap();
        let path = state.ledger_dir().join(format!("{}.json", tx_id));
        let stored: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        stored["tags"].clone()
    }

    #[tokio::test]
    async fn test_put_then_get_public_drive() {
        let (_temp_dir, ctx) = setup().await;
        let lines = put_drive(&ctx, None).await;

        assert_eq!(lines.len(), 2);
        let (drive_kind, drive_id, drive_tx) = &lines[0];
        let (root_kind, root_id, root_tx) = &lines[1];
        assert_eq!(drive_kind, "drive");
        assert_eq!(root_kind, "folder");
        assert!(stored_tags(&ctx, drive_tx).get("Cipher").is_none());

        let drive = get(&ctx, EntityType::Drive, drive_tx, None, None).await.unwrap();
        assert_eq!(drive["entityType"], "drive");
        assert_eq!(drive["name"], "Photos");
        assert_eq!(drive["privacy"], "public");
        assert_eq!(drive["id"], drive_id.to_string());
        assert_eq!(drive["rootFolderId"], root_id.to_string());
        assert_eq!(drive["transactionId"], drive_tx.as_str());

        let root = get(&ctx, EntityType::Folder, root_tx, None, None).await.unwrap();
        assert_eq!(root["name"], "Photos");
        assert_eq!(root["driveId"], drive_id.to_string());
        assert!(root.get("parentFolderId").is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_private_drive_and_file() {
        let (_temp_dir, ctx) = setup().await;
        let lines = put_drive(&ctx, Some(PASSWORD)).await;
        let (_, drive_id, drive_tx) = &lines[0];
        let (_, root_id, root_tx) = &lines[1];

        for tx_id in [drive_tx, root_tx] {
            let tags = stored_tags(&ctx, tx_id);
            assert_eq!(tags["Cipher"], "AES256-GCM");
            assert_eq!(tags["Content-Type"], "application/octet-stream");
        }

        // The drive id comes from the record's Drive-Id tag
        let drive = get(&ctx, EntityType::Drive, drive_tx, None, Some(PASSWORD))
            .await
            .unwrap();
        assert_eq!(drive["privacy"], "private");
        assert_eq!(drive["rootFolderId"], root_id.to_string());

        let files = put(
            &ctx,
            PutEntity::File(PutFile {
                name: "beach.png".to_string(),
                drive_id: *drive_id,
                parent_folder_id: *root_id,
                size: 2048,
                data_tx_id: "t8pLpJhwBkIXrRDpZ6iVZRA3Ff3ixhcYKAwMVc_D6ZU".to_string(),
                content_type: None,
                last_modified: Some(1_612_424_488_033),
                file_id: None,
                password: Some(PASSWORD.to_string()),
            }),
        )
        .await;
        let (file_kind, _, file_tx) = &files[0];
        assert_eq!(file_kind, "file");

        let file = get(
            &ctx,
            EntityType::File,
            file_tx,
            Some(*drive_id),
            Some(PASSWORD),
        )
        .await
        .unwrap();
        assert_eq!(file["name"], "beach.png");
        assert_eq!(file["size"], 2048);
        assert_eq!(file["dataContentType"], "image/png");
        assert_eq!(file["parentFolderId"], root_id.to_string());
    }

    #[tokio::test]
    async fn test_get_private_needs_password() {
        let (_temp_dir, ctx) = setup().await;
        let lines = put_drive(&ctx, Some(PASSWORD)).await;
        let (_, _, drive_tx) = &lines[0];

        assert!(matches!(
            get(&ctx, EntityType::Drive, drive_tx, None, None).await,
            Err(GetError::Read(ReadError::Entity(
                common::entity::EntityError::MissingDecryptionKey
            )))
        ));
        assert!(matches!(
            get(&ctx, EntityType::Drive, drive_tx, None, Some("wrong")).await,
            Err(GetError::Read(ReadError::Entity(
                common::entity::EntityError::Envelope(_)
            )))
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_transaction() {
        let (_temp_dir, ctx) = setup().await;
        let missing = "A".repeat(43);
        assert!(matches!(
            get(&ctx, EntityType::Folder, &missing, None, None).await,
            Err(GetError::Read(ReadError::Ledger(LedgerError::NotFound(_))))
        ));
    }
}
