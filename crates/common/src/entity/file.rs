use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::tags::TagFields;
use super::validate::{Validator, ViolationKind};

/// A pointer to file content stored in a separate data transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub name: String,
    pub drive_id: Uuid,
    pub parent_folder_id: Uuid,
    pub size: u64,
    /// Millisecond precision; finer precision is dropped by `File::new` and
    /// rejected by validation
    pub last_modified_date: DateTime<Utc>,
    pub data_tx_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_content_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilePayload<'a> {
    name: &'a str,
    size: u64,
    last_modified_date: i64,
    data_tx_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_content_type: Option<&'a str>,
}

impl File {
    pub fn new(
        name: impl Into<String>,
        drive_id: Uuid,
        parent_folder_id: Uuid,
        size: u64,
        last_modified_date: DateTime<Utc>,
        data_tx_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            drive_id,
            parent_folder_id,
            size,
            last_modified_date: last_modified_date.trunc_subsecs(3),
            data_tx_id: data_tx_id.into(),
            data_content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.data_content_type = Some(content_type.into());
        self
    }

    pub(crate) fn check(&self, v: &mut Validator) {
        v.non_empty("name", &self.name);
        v.positive("size", self.size);
        v.precision("lastModifiedDate", self.last_modified_date, 3, "millisecond");
        v.non_empty("dataTxId", &self.data_tx_id);
        if let Some(content_type) = &self.data_content_type {
            v.content_type("dataContentType", content_type);
        }
    }

    pub(crate) fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&FilePayload {
            name: &self.name,
            size: self.size,
            last_modified_date: self.last_modified_date.timestamp_millis(),
            data_tx_id: &self.data_tx_id,
            data_content_type: self.data_content_type.as_deref(),
        })
    }

    pub(crate) fn from_record(
        payload: &Map<String, Value>,
        fields: &TagFields,
        v: &mut Validator,
    ) -> Option<Self> {
        let name = v.json_string(payload, "name");
        let drive_id = v.id("driveId", fields.drive_id.as_deref());
        let parent_folder_id = v.id("parentFolderId", fields.parent_folder_id.as_deref());
        let size = v.json_positive_integer(payload, "size");
        let last_modified_date = last_modified_date(payload, v);
        let data_tx_id = v.json_string(payload, "dataTxId");
        let data_content_type = v
            .optional_json_string(payload, "dataContentType")
            .filter(|content_type| match content_type {
                Some(content_type) => v.content_type("dataContentType", content_type),
                None => true,
            });

        Some(Self {
            name: name?,
            drive_id: drive_id?,
            parent_folder_id: parent_folder_id?,
            size: size?,
            last_modified_date: last_modified_date?,
            data_tx_id: data_tx_id?,
            data_content_type: data_content_type?,
        })
    }
}

/// Integer milliseconds, or an RFC 3339 string in older records
fn last_modified_date(payload: &Map<String, Value>, v: &mut Validator) -> Option<DateTime<Utc>> {
    const FIELD: &str = "lastModifiedDate";

    let parsed = match payload.get(FIELD) {
        None | Some(Value::Null) => {
            v.push(FIELD, ViolationKind::Missing);
            return None;
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|date| date.with_timezone(&Utc).trunc_subsecs(3)),
        Some(_) => {
            v.push(FIELD, ViolationKind::WrongType("number"));
            return None;
        }
    };

    if parsed.is_none() {
        let raw = payload.get(FIELD).map(Value::to_string).unwrap_or_default();
        v.push(FIELD, ViolationKind::InvalidDate(raw));
    }
    parsed
}
