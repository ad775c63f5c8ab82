//! Drive, folder and file entities
//!
//! An entity is one immutable metadata record. Its identity and relational
//! fields (id, drive, parent, creation time) always travel as public tags so
//! the ledger can route records without reading them; its kind-specific
//! fields travel as a canonical JSON payload that is either plain or sealed
//! in an envelope as a whole.
//!
//! - [`tags`] projects entities onto tag maps and back
//! - [`codec`] turns entities into ledger records and reassembles them
//! - [`validate`] collects every field violation of a record at once

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod codec;
mod drive;
mod file;
mod folder;
pub mod tags;
mod unix_time;
pub mod validate;

pub use codec::{decode, encode, EntityRecord, Sealing};
pub use drive::{Drive, DrivePrivacy};
pub use file::File;
pub use folder::Folder;
pub use tags::{from_tags, to_tags, EntityTag, TagFields, TagMap};
pub use unix_time::{format_unix_time, parse_unix_time};
pub use validate::{Violation, ViolationKind, Violations};

use crate::crypto::{EnvelopeError, KeyError};
use crate::ledger::TransactionId;
use validate::Validator;

/// Version of the entity encoding written to the `ArFS` tag
pub const ARFS_VERSION: &str = "0.11";
/// Content type of unsealed payloads
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("record is sealed but no drive key was supplied")]
    MissingDecryptionKey,
    #[error("validation failed: {0}")]
    Validation(Violations),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
}

impl From<Violations> for EntityError {
    fn from(violations: Violations) -> Self {
        EntityError::Validation(violations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Drive,
    Folder,
    File,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Drive => "drive",
            EntityType::Folder => "folder",
            EntityType::File => "file",
        }
    }

    /// The tag carrying the entity's own id
    pub fn id_tag(&self) -> EntityTag {
        match self {
            EntityType::Drive => EntityTag::DriveId,
            EntityType::Folder => EntityTag::FolderId,
            EntityType::File => EntityTag::FileId,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drive" => Ok(EntityType::Drive),
            "folder" => Ok(EntityType::Folder),
            "file" => Ok(EntityType::File),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

/// Kind-specific fields of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entityType", rename_all = "lowercase")]
pub enum EntityData {
    Drive(Drive),
    Folder(Folder),
    File(File),
}

impl EntityData {
    pub fn kind(&self) -> EntityType {
        match self {
            EntityData::Drive(_) => EntityType::Drive,
            EntityData::Folder(_) => EntityType::Folder,
            EntityData::File(_) => EntityType::File,
        }
    }

    pub(crate) fn check(&self, v: &mut Validator) {
        match self {
            EntityData::Drive(drive) => drive.check(v),
            EntityData::Folder(folder) => folder.check(v),
            EntityData::File(file) => file.check(v),
        }
    }

    /// Canonical bytes of the kind-specific fields
    pub(crate) fn to_payload(&self) -> Result<Vec<u8>, EntityError> {
        match self {
            EntityData::Drive(drive) => drive.to_payload(),
            EntityData::Folder(folder) => folder.to_payload(),
            EntityData::File(file) => file.to_payload(),
        }
        .map_err(|e| EntityError::MalformedPayload(e.to_string()))
    }
}

impl From<Drive> for EntityData {
    fn from(drive: Drive) -> Self {
        EntityData::Drive(drive)
    }
}

impl From<Folder> for EntityData {
    fn from(folder: Folder) -> Self {
        EntityData::Folder(folder)
    }
}

impl From<File> for EntityData {
    fn from(file: File) -> Self {
        EntityData::File(file)
    }
}

/// One revision of a drive, folder or file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: Uuid,
    /// Set once the entity has been written to or read from a ledger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_owner_address: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: EntityData,
}

impl Entity {
    /// Build and validate a fresh entity created now
    pub fn new(id: Uuid, data: impl Into<EntityData>) -> Result<Self, EntityError> {
        Self::new_at(id, data, unix_time::now())
    }

    /// Build and validate a fresh entity with an explicit creation time,
    /// truncated to whole seconds
    pub fn new_at(
        id: Uuid,
        data: impl Into<EntityData>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, EntityError> {
        let entity = Self {
            id,
            transaction_id: None,
            transaction_owner_address: None,
            created_at: created_at.trunc_subsecs(0),
            data: data.into(),
        };
        entity.validate()?;
        Ok(entity)
    }

    pub fn kind(&self) -> EntityType {
        self.data.kind()
    }

    /// Check every field constraint, reporting all violations together
    pub fn validate(&self) -> Result<(), EntityError> {
        let mut v = Validator::new();
        v.precision("createdAt", self.created_at, 0, "second");
        self.data.check(&mut v);
        v.finish().map_err(|violations| {
            tracing::warn!(
                id = %self.id,
                kind = %self.kind(),
                count = violations.len(),
                "entity failed validation"
            );
            EntityError::Validation(violations)
        })
    }

    pub fn with_transaction(mut self, transaction_id: TransactionId, owner_address: String) -> Self {
        self.transaction_id = Some(transaction_id);
        self.transaction_owner_address = Some(owner_address);
        self
    }

    /// The drive this entity belongs to; a drive belongs to itself
    pub fn drive_id(&self) -> Uuid {
        match &self.data {
            EntityData::Drive(_) => self.id,
            EntityData::Folder(folder) => folder.drive_id,
            EntityData::File(file) => file.drive_id,
        }
    }

    pub fn name(&self) -> &str {
        match &self.data {
            EntityData::Drive(drive) => &drive.name,
            EntityData::Folder(folder) => &folder.name,
            EntityData::File(file) => &file.name,
        }
    }

    pub fn as_drive(&self) -> Option<&Drive> {
        match &self.data {
            EntityData::Drive(drive) => Some(drive),
            _ => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match &self.data {
            EntityData::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match &self.data {
            EntityData::File(file) => Some(file),
            _ => None,
        }
    }
}
