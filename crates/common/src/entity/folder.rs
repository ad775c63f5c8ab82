use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::tags::TagFields;
use super::validate::Validator;

/// A directory within a drive
///
/// Only a drive's root folder has no parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub name: String,
    pub drive_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<Uuid>,
}

#[derive(Serialize)]
struct FolderPayload<'a> {
    name: &'a str,
}

impl Folder {
    pub fn new(name: impl Into<String>, drive_id: Uuid, parent_folder_id: Uuid) -> Self {
        Self {
            name: name.into(),
            drive_id,
            parent_folder_id: Some(parent_folder_id),
        }
    }

    pub fn root(name: impl Into<String>, drive_id: Uuid) -> Self {
        Self {
            name: name.into(),
            drive_id,
            parent_folder_id: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_folder_id.is_none()
    }

    pub(crate) fn check(&self, v: &mut Validator) {
        v.non_empty("name", &self.name);
    }

    pub(crate) fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&FolderPayload { name: &self.name })
    }

    pub(crate) fn from_record(
        payload: &Map<String, Value>,
        fields: &TagFields,
        v: &mut Validator,
    ) -> Option<Self> {
        let name = v.json_string(payload, "name");
        let drive_id = v.id("driveId", fields.drive_id.as_deref());
        let parent_folder_id = v.optional_id("parentFolderId", fields.parent_folder_id.as_deref());

        Some(Self {
            name: name?,
            drive_id: drive_id?,
            parent_folder_id: parent_folder_id?,
        })
    }
}
