//! Tag vocabulary and projection of entities onto tag maps
//!
//! The tag map is the only structured header a ledger record carries. Every
//! identity and relational field of an entity is projected into it so that
//! records can be routed and queried without being decrypted.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::unix_time::{format_unix_time, parse_unix_time};
use super::{Entity, EntityData, ARFS_VERSION};

/// The tags placed on entity records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTag {
    ArFS,
    UnixTime,
    EntityType,
    DriveId,
    FolderId,
    FileId,
    ParentFolderId,
    DrivePrivacy,
    DriveAuthMode,
    Cipher,
    CipherIv,
    ContentType,
}

impl EntityTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityTag::ArFS => "ArFS",
            EntityTag::UnixTime => "Unix-Time",
            EntityTag::EntityType => "Entity-Type",
            EntityTag::DriveId => "Drive-Id",
            EntityTag::FolderId => "Folder-Id",
            EntityTag::FileId => "File-Id",
            EntityTag::ParentFolderId => "Parent-Folder-Id",
            EntityTag::DrivePrivacy => "Drive-Privacy",
            EntityTag::DriveAuthMode => "Drive-Auth-Mode",
            EntityTag::Cipher => "Cipher",
            EntityTag::CipherIv => "Cipher-IV",
            EntityTag::ContentType => "Content-Type",
        }
    }
}

impl AsRef<str> for EntityTag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat, case-sensitive string map carried beside every record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.as_ref().to_string(), value.into())
    }

    /// Insert `value` only if it is present; absent values are never written
    /// as empty strings
    pub fn insert_opt<V: Into<String>>(&mut self, key: impl AsRef<str>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.0.get(key.as_ref()).map(String::as_str)
    }

    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.0.contains_key(key.as_ref())
    }

    pub fn remove(&mut self, key: impl AsRef<str>) -> Option<String> {
        self.0.remove(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Extend<(String, String)> for TagMap {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for TagMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Project an entity's identity and relational fields into tags
///
/// Content and cipher tags are not included; those come from the codec.
pub fn to_tags(entity: &Entity) -> TagMap {
    let mut tags = TagMap::new();
    tags.insert(EntityTag::ArFS, ARFS_VERSION);
    tags.insert(EntityTag::UnixTime, format_unix_time(&entity.created_at));
    tags.insert(EntityTag::EntityType, entity.kind().as_str());

    let id = entity.id.to_string();
    match &entity.data {
        EntityData::Drive(drive) => {
            tags.insert(EntityTag::DriveId, id);
            tags.insert(EntityTag::DrivePrivacy, drive.privacy.as_str());
            tags.insert_opt(EntityTag::DriveAuthMode, drive.auth_mode.map(|m| m.as_str()));
        }
        EntityData::Folder(folder) => {
            tags.insert(EntityTag::FolderId, id);
            tags.insert(EntityTag::DriveId, folder.drive_id.to_string());
            tags.insert_opt(
                EntityTag::ParentFolderId,
                folder.parent_folder_id.map(|p| p.to_string()),
            );
        }
        EntityData::File(file) => {
            tags.insert(EntityTag::FileId, id);
            tags.insert(EntityTag::DriveId, file.drive_id.to_string());
            tags.insert(EntityTag::ParentFolderId, file.parent_folder_id.to_string());
        }
    }

    tags
}

/// Identity, relational and cipher fields extracted from a tag map
///
/// Values are kept as raw text; validation happens when the entity is
/// assembled so that every defect can be reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub arfs_version: Option<String>,
    pub unix_time: Option<String>,
    pub entity_type: Option<String>,
    pub drive_id: Option<String>,
    pub folder_id: Option<String>,
    pub file_id: Option<String>,
    pub parent_folder_id: Option<String>,
    pub drive_privacy: Option<String>,
    pub drive_auth_mode: Option<String>,
    pub cipher: Option<String>,
    pub cipher_iv: Option<String>,
    pub content_type: Option<String>,
}

impl TagFields {
    /// The creation time, or `None` when the tag is absent or not a number
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.unix_time.as_deref().and_then(parse_unix_time)
    }

    pub fn is_sealed(&self) -> bool {
        self.cipher.is_some()
    }
}

/// Extract the known tags from a tag map; unknown tags are ignored
pub fn from_tags(tags: &TagMap) -> TagFields {
    let get = |tag: EntityTag| tags.get(tag).map(str::to_string);
    TagFields {
        arfs_version: get(EntityTag::ArFS),
        unix_time: get(EntityTag::UnixTime),
        entity_type: get(EntityTag::EntityType),
        drive_id: get(EntityTag::DriveId),
        folder_id: get(EntityTag::FolderId),
        file_id: get(EntityTag::FileId),
        parent_folder_id: get(EntityTag::ParentFolderId),
        drive_privacy: get(EntityTag::DrivePrivacy),
        drive_auth_mode: get(EntityTag::DriveAuthMode),
        cipher: get(EntityTag::Cipher),
        cipher_iv: get(EntityTag::CipherIv),
        content_type: get(EntityTag::ContentType),
    }
}
