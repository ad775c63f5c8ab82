use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::tags::TagFields;
use super::validate::{Validator, ViolationKind};
use crate::crypto::DriveAuthMode;

/// Whether a drive's entities are sealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrivePrivacy {
    /// Records predating the `Drive-Privacy` tag are public
    #[default]
    Public,
    Private,
}

impl DrivePrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrivePrivacy::Public => "public",
            DrivePrivacy::Private => "private",
        }
    }
}

impl fmt::Display for DrivePrivacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrivePrivacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(DrivePrivacy::Public),
            "private" => Ok(DrivePrivacy::Private),
            other => Err(other.to_string()),
        }
    }
}

/// The root of a lineage of folders and files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub name: String,
    pub root_folder_id: Uuid,
    pub privacy: DrivePrivacy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_mode: Option<DriveAuthMode>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DrivePayload<'a> {
    name: &'a str,
    root_folder_id: String,
}

impl Drive {
    pub fn new(
        name: impl Into<String>,
        root_folder_id: Uuid,
        privacy: DrivePrivacy,
        auth_mode: Option<DriveAuthMode>,
    ) -> Self {
        Self {
            name: name.into(),
            root_folder_id,
            privacy,
            auth_mode,
        }
    }

    pub fn public(name: impl Into<String>, root_folder_id: Uuid) -> Self {
        Self::new(name, root_folder_id, DrivePrivacy::Public, None)
    }

    pub fn private(name: impl Into<String>, root_folder_id: Uuid, auth_mode: DriveAuthMode) -> Self {
        Self::new(name, root_folder_id, DrivePrivacy::Private, Some(auth_mode))
    }

    pub fn is_private(&self) -> bool {
        self.privacy == DrivePrivacy::Private
    }

    pub(crate) fn check(&self, v: &mut Validator) {
        v.non_empty("name", &self.name);
        check_auth_mode(v, self.privacy, self.auth_mode);
    }

    pub(crate) fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&DrivePayload {
            name: &self.name,
            root_folder_id: self.root_folder_id.to_string(),
        })
    }

    pub(crate) fn from_record(
        payload: &Map<String, Value>,
        fields: &TagFields,
        v: &mut Validator,
    ) -> Option<Self> {
        let name = v.json_string(payload, "name");
        let root_folder_id = v
            .json_string(payload, "rootFolderId")
            .and_then(|id| v.id("rootFolderId", Some(&id)));

        let privacy = match fields.drive_privacy.as_deref() {
            None => Some(DrivePrivacy::default()),
            Some(privacy) => v.parse::<DrivePrivacy>("privacy", privacy),
        };
        let auth_mode = match fields.drive_auth_mode.as_deref() {
            None => Some(None),
            Some(mode) => v.parse::<DriveAuthMode>("authMode", mode).map(Some),
        };
        if let (Some(privacy), Some(auth_mode)) = (privacy, auth_mode) {
            check_auth_mode(v, privacy, auth_mode);
        }

        Some(Self {
            name: name?,
            root_folder_id: root_folder_id?,
            privacy: privacy?,
            auth_mode: auth_mode?,
        })
    }
}

fn check_auth_mode(v: &mut Validator, privacy: DrivePrivacy, auth_mode: Option<DriveAuthMode>) {
    match (privacy, auth_mode) {
        (DrivePrivacy::Private, None) => v.push("authMode", ViolationKind::Missing),
        (DrivePrivacy::Public, Some(mode)) => {
            v.push("authMode", ViolationKind::Unexpected(mode.to_string()))
        }
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_payload_field_order() {
        let root = Uuid::parse_str("5a1c8e3a-3d4e-4b59-9e0a-1f0d6f1c2b3a").unwrap();
        let drive = Drive::public("My Drive", root);
        let bytes = drive.to_payload().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"name":"My Drive","rootFolderId":"5a1c8e3a-3d4e-4b59-9e0a-1f0d6f1c2b3a"}"#
        );
    }

    #[test]
    fn test_privacy_defaults_to_public() {
        let root = Uuid::new_v4();
        let mut v = Validator::new();
        let drive = Drive::from_record(
            &payload(json!({ "name": "d", "rootFolderId": root.to_string() })),
            &TagFields::default(),
            &mut v,
        )
        .unwrap();
        assert!(v.finish().is_ok());
        assert_eq!(drive.privacy, DrivePrivacy::Public);
        assert_eq!(drive.auth_mode, None);
    }

    #[test]
    fn test_private_drive_requires_auth_mode() {
        let mut v = Validator::new();
        Drive::new("d", Uuid::new_v4(), DrivePrivacy::Private, None).check(&mut v);
        Drive::new("d", Uuid::new_v4(), DrivePrivacy::Public, Some(DriveAuthMode::Password))
            .check(&mut v);
        let violations = v.finish().unwrap_err();
        assert_eq!(violations.fields(), vec!["authMode", "authMode"]);
    }

    #[test]
    fn test_from_record_collects_violations() {
        let fields = TagFields {
            drive_privacy: Some("secret".into()),
            drive_auth_mode: Some("retina".into()),
            ..Default::default()
        };
        let mut v = Validator::new();
        let drive = Drive::from_record(
            &payload(json!({ "name": "", "rootFolderId": "abc" })),
            &fields,
            &mut v,
        );
        assert!(drive.is_none());
        assert_eq!(
            v.finish().unwrap_err().fields(),
            vec!["name", "rootFolderId", "privacy", "authMode"]
        );
    }
}
