use chrono::{DateTime, TimeZone, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use common::crypto::{DriveAuthMode, KeyError, WalletSigner};
use common::entity::{Drive, Entity, EntityError, File, Folder, Sealing};
use common::ledger::{write_entity, FsLedgerProvider, FsLedgerProviderError, WriteError};

use super::{parse_id, password_drive_key};
use crate::state::{AppState, StateError};

/// Build an entity and write it to the local ledger
#[derive(Args, Debug, Clone)]
pub struct Put {
    #[command(subcommand)]
    pub entity: PutEntity,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PutEntity {
    /// Create a drive together with its root folder
    Drive(PutDrive),
    Folder(PutFolder),
    File(PutFile),
}

#[derive(Args, Debug, Clone)]
pub struct PutDrive {
    #[arg(long)]
    pub name: String,

    /// Defaults to a fresh id
    #[arg(long, value_parser = parse_id)]
    pub drive_id: Option<Uuid>,

    /// Name of the root folder, defaults to the drive name
    #[arg(long)]
    pub root_folder_name: Option<String>,

    /// Make the drive private, sealed under a key derived from this password
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PutFolder {
    #[arg(long)]
    pub name: String,

    #[arg(long, value_parser = parse_id)]
    pub drive_id: Uuid,

    /// Omit only for a drive's root folder
    #[arg(long, value_parser = parse_id)]
    pub parent_folder_id: Option<Uuid>,

    #[arg(long, value_parser = parse_id)]
    pub folder_id: Option<Uuid>,

    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PutFile {
    #[arg(long)]
    pub name: String,

    #[arg(long, value_parser = parse_id)]
    pub drive_id: Uuid,

    #[arg(long, value_parser = parse_id)]
    pub parent_folder_id: Uuid,

    /// Size of the file content in bytes
    #[arg(long)]
    pub size: u64,

    /// Transaction holding the file content
    #[arg(long)]
    pub data_tx_id: String,

    /// Guessed from the file name when not given
    #[arg(long)]
    pub content_type: Option<String>,

    /// Milliseconds since epoch, defaults to now
    #[arg(long)]
    pub last_modified: Option<i64>,

    #[arg(long, value_parser = parse_id)]
    pub file_id: Option<Uuid>,

    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key derivation failed: {0}")]
    Key(#[from] KeyError),
    #[error("invalid entity: {0}")]
    Entity(#[from] EntityError),
    #[error("write failed: {0}")]
    Write(#[from] WriteError<FsLedgerProviderError>),
    #[error("invalid last modified time: {0}")]
    InvalidTime(i64),
}

/// Everything a write needs besides the entity itself
struct Writer {
    state: AppState,
    wallet: Box<dyn WalletSigner>,
    ledger: FsLedgerProvider,
}

impl Writer {
    async fn open(ctx: &crate::op::OpContext) -> Result<Self, PutError> {
        let state = ctx.state()?;
        let wallet = state.load_wallet()?;
        let ledger = state.ledger(wallet.address()).await?;
        Ok(Self {
            state,
            wallet,
            ledger,
        })
    }

    /// Write `entity`, sealed under the drive's password key when one is given
    async fn write(
        &self,
        entity: Entity,
        drive_id: Uuid,
        password: Option<&str>,
    ) -> Result<String, PutError> {
        let drive_key = password
            .map(|password| password_drive_key(self.wallet.as_ref(), drive_id, password))
            .transpose()?;
        let sealing = match &drive_key {
            Some(drive_key) => Sealing::Sealed {
                cipher: self.state.config.cipher,
                drive_key,
            },
            None => Sealing::Unsealed,
        };

        let written = write_entity(&self.ledger, &entity, sealing).await?;
        let tx_id = written
            .transaction_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        Ok(format!("{} {} tx {}", written.kind(), written.id, tx_id))
    }
}

fn last_modified(millis: Option<i64>) -> Result<DateTime<Utc>, PutError> {
    match millis {
        None => Ok(Utc::now()),
        Some(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or(PutError::InvalidTime(ms)),
    }
}

fn guess_content_type(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

#[async_trait::async_trait]
impl crate::op::Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let writer = Writer::open(ctx).await?;

        match &self.entity {
            PutEntity::Drive(args) => {
                let drive_id = args.drive_id.unwrap_or_else(Uuid::new_v4);
                let root_folder_id = Uuid::new_v4();
                let drive = match args.password {
                    Some(_) => Drive::private(&args.name, root_folder_id, DriveAuthMode::Password),
                    None => Drive::public(&args.name, root_folder_id),
                };
                let root_name = args.root_folder_name.as_deref().unwrap_or(&args.name);

                let drive = Entity::new(drive_id, drive)?;
                let root = Entity::new(root_folder_id, Folder::root(root_name, drive_id))?;

                let password = args.password.as_deref();
                let drive_line = writer.write(drive, drive_id, password).await?;
                let root_line = writer.write(root, drive_id, password).await?;
                Ok(format!("{}\n{}", drive_line, root_line))
            }
            PutEntity::Folder(args) => {
                let folder = match args.parent_folder_id {
                    Some(parent) => Folder::new(&args.name, args.drive_id, parent),
                    None => Folder::root(&args.name, args.drive_id),
                };
                let entity = Entity::new(args.folder_id.unwrap_or_else(Uuid::new_v4), folder)?;
                writer
                    .write(entity, args.drive_id, args.password.as_deref())
                    .await
            }
            PutEntity::File(args) => {
                let mut file = File::new(
                    &args.name,
                    args.drive_id,
                    args.parent_folder_id,
                    args.size,
                    last_modified(args.last_modified)?,
                    &args.data_tx_id,
                );
                if let Some(content_type) = args
                    .content_type
                    .clone()
                    .or_else(|| guess_content_type(&args.name))
                {
                    file = file.with_content_type(content_type);
                }
                let entity = Entity::new(args.file_id.unwrap_or_else(Uuid::new_v4), file)?;
                writer
                    .write(entity, args.drive_id, args.password.as_deref())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("notes.txt").as_deref(), Some("text/plain"));
        assert_eq!(guess_content_type("photo.PNG").as_deref(), Some("image/png"));
        assert_eq!(guess_content_type("no_extension"), None);
    }

    #[test]
    fn test_last_modified() {
        assert_eq!(
            last_modified(Some(1_612_424_488_033)).unwrap().timestamp_millis(),
            1_612_424_488_033
        );
        assert!(matches!(
            last_modified(Some(i64::MAX)),
            Err(PutError::InvalidTime(_))
        ));
    }
}
