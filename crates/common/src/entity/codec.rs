//! Encoding entities into ledger records and back
//!
//! ```text
//! encode: Entity ─validate─> payload JSON ─(seal)─> data
//!                    └──────────── to_tags ───────> tags
//!
//! decode: tags ─from_tags─> identity fields ─┐
//!         data ─(open)─> payload JSON ───────┴─validate─> Entity
//! ```
//!
//! Files are sealed with the key derived from their drive key and file id;
//! drives and folders are sealed with the drive key itself.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tags::{from_tags, to_tags, EntityTag, TagFields, TagMap};
use super::validate::{Validator, ViolationKind};
use super::{
    Drive, DrivePrivacy, Entity, EntityData, EntityError, EntityType, File, Folder,
    JSON_CONTENT_TYPE,
};
use crate::crypto::{derive_file_key, open, seal, Cipher, DriveKey};

/// Whether an entity is written in the clear or sealed under its drive key
///
/// Encryption is all-or-nothing: a sealed record carries none of its
/// kind-specific fields in the clear.
#[derive(Debug, Clone, Copy)]
pub enum Sealing<'a> {
    Unsealed,
    Sealed {
        cipher: Cipher,
        drive_key: &'a DriveKey,
    },
}

impl<'a> Sealing<'a> {
    /// Seal with the default cipher
    pub fn sealed(drive_key: &'a DriveKey) -> Self {
        Sealing::Sealed {
            cipher: Cipher::default(),
            drive_key,
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, Sealing::Sealed { .. })
    }
}

impl<'a> From<Option<&'a DriveKey>> for Sealing<'a> {
    fn from(drive_key: Option<&'a DriveKey>) -> Self {
        match drive_key {
            Some(drive_key) => Sealing::sealed(drive_key),
            None => Sealing::Unsealed,
        }
    }
}

/// Record body and tags exactly as they are submitted to a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub data: Vec<u8>,
    pub tags: TagMap,
}

impl EntityRecord {
    pub fn is_sealed(&self) -> bool {
        self.tags.contains(EntityTag::Cipher)
    }
}

/// Encode an entity into a record
///
/// # Errors
///
/// - [`EntityError::Validation`] if the entity violates a field constraint,
///   including a private drive written unsealed or a public drive sealed
/// - [`EntityError::Key`] or [`EntityError::Envelope`] if sealing fails
pub fn encode(entity: &Entity, sealing: Sealing<'_>) -> Result<EntityRecord, EntityError> {
    entity.validate()?;
    if let EntityData::Drive(drive) = &entity.data {
        let mut v = Validator::new();
        check_drive_sealing(&mut v, drive, sealing.is_sealed());
        v.finish()?;
    }

    let payload = entity.data.to_payload()?;
    let (data, mut tags) = match sealing {
        Sealing::Unsealed => {
            let mut tags = TagMap::new();
            tags.insert(EntityTag::ContentType, JSON_CONTENT_TYPE);
            (payload, tags)
        }
        Sealing::Sealed { cipher, drive_key } => {
            let envelope = match &entity.data {
                EntityData::File(_) => {
                    let file_key = derive_file_key(drive_key, entity.id)?;
                    seal(&payload, file_key.secret(), cipher)?
                }
                _ => seal(&payload, drive_key.secret(), cipher)?,
            };
            (envelope.ciphertext, envelope.tags)
        }
    };
    tags.extend(to_tags(entity));

    tracing::debug!(
        id = %entity.id,
        kind = %entity.kind(),
        sealed = sealing.is_sealed(),
        len = data.len(),
        "encoded entity"
    );
    Ok(EntityRecord { data, tags })
}

/// Reassemble an entity of the expected kind from a record
///
/// Transaction fields of the returned entity are left empty.
///
/// # Errors
///
/// - [`EntityError::MissingDecryptionKey`] if the record is sealed and no
///   drive key is given
/// - [`EntityError::Envelope`] if the payload cannot be opened
/// - [`EntityError::MalformedPayload`] if the payload is not a JSON object
/// - [`EntityError::Validation`] listing every violated field constraint
pub fn decode(
    kind: EntityType,
    record: &EntityRecord,
    drive_key: Option<&DriveKey>,
) -> Result<Entity, EntityError> {
    let fields = from_tags(&record.tags);
    let mut v = Validator::new();
    let id = v.id("id", entity_id_tag(kind, &fields));

    let payload = if fields.is_sealed() {
        let drive_key = drive_key.ok_or(EntityError::MissingDecryptionKey)?;
        let plaintext = match kind {
            EntityType::File => {
                // the file key cannot be derived without a usable file id
                let Some(file_id) = id else {
                    return Err(v.finish().err().unwrap_or_default().into());
                };
                let file_key = derive_file_key(drive_key, file_id)?;
                open(&record.data, &record.tags, file_key.secret())?
            }
            _ => open(&record.data, &record.tags, drive_key.secret())?,
        };
        Cow::Owned(plaintext)
    } else {
        Cow::Borrowed(record.data.as_slice())
    };
    let payload = parse_payload(&payload)?;

    let created_at = match fields.unix_time.as_deref() {
        None => {
            v.push("createdAt", ViolationKind::Missing);
            None
        }
        Some(raw) => {
            let created_at = fields.created_at();
            if created_at.is_none() {
                v.push("createdAt", ViolationKind::NotANumber(raw.to_string()));
            }
            created_at
        }
    };

    if let Some(found) = fields.entity_type.as_deref() {
        if found != kind.as_str() {
            v.push(
                "entityType",
                ViolationKind::Mismatch {
                    expected: kind.as_str().to_string(),
                    found: found.to_string(),
                },
            );
        }
    }

    let data = match kind {
        EntityType::Drive => Drive::from_record(&payload, &fields, &mut v).map(EntityData::Drive),
        EntityType::Folder => {
            Folder::from_record(&payload, &fields, &mut v).map(EntityData::Folder)
        }
        EntityType::File => File::from_record(&payload, &fields, &mut v).map(EntityData::File),
    };
    if let Some(EntityData::Drive(drive)) = &data {
        check_drive_sealing(&mut v, drive, fields.is_sealed());
    }

    match (v.finish(), id, created_at, data) {
        (Ok(()), Some(id), Some(created_at), Some(data)) => {
            tracing::debug!(%id, %kind, sealed = fields.is_sealed(), "decoded entity");
            Ok(Entity {
                id,
                transaction_id: None,
                transaction_owner_address: None,
                created_at,
                data,
            })
        }
        (result, ..) => {
            let violations = result.err().unwrap_or_default();
            tracing::warn!(%kind, count = violations.len(), "record failed validation");
            Err(EntityError::Validation(violations))
        }
    }
}

fn entity_id_tag(kind: EntityType, fields: &TagFields) -> Option<&str> {
    match kind {
        EntityType::Drive => fields.drive_id.as_deref(),
        EntityType::Folder => fields.folder_id.as_deref(),
        EntityType::File => fields.file_id.as_deref(),
    }
}

fn parse_payload(bytes: &[u8]) -> Result<Map<String, Value>, EntityError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(EntityError::MalformedPayload(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(EntityError::MalformedPayload(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_drive_sealing(v: &mut Validator, drive: &Drive, sealed: bool) {
    let expected = if sealed {
        DrivePrivacy::Private
    } else {
        DrivePrivacy::Public
    };
    if drive.privacy != expected {
        v.push(
            "privacy",
            ViolationKind::Mismatch {
                expected: expected.to_string(),
                found: drive.privacy.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{DriveAuthMode, EnvelopeError};
    use chrono::Utc;
    use uuid::Uuid;

    fn drive_key() -> DriveKey {
        DriveKey::from([7u8; 32])
    }

    fn folder() -> Entity {
        Entity::new(Uuid::new_v4(), Folder::new("docs", Uuid::new_v4(), Uuid::new_v4())).unwrap()
    }

    #[test]
    fn test_unsealed_record() {
        let entity = folder();
        let record = encode(&entity, Sealing::Unsealed).unwrap();
        assert!(!record.is_sealed());
        assert_eq!(record.tags.get(EntityTag::ContentType), Some(JSON_CONTENT_TYPE));
        assert_eq!(record.data, br#"{"name":"docs"}"#.to_vec());
        assert_eq!(decode(EntityType::Folder, &record, None).unwrap(), entity);
    }

    #[test]
    fn test_encode_rejects_sub_second_created_at() {
        use chrono::TimeZone;

        let mut entity = folder();
        entity.created_at = Utc.timestamp_millis_opt(1_612_424_488_033).unwrap();

        match encode(&entity, Sealing::Unsealed) {
            Err(EntityError::Validation(violations)) => {
                assert_eq!(violations.fields(), vec!["createdAt"]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }

        entity.created_at = Utc.timestamp_opt(1_612_424_488, 0).unwrap();
        let record = encode(&entity, Sealing::Unsealed).unwrap();
        assert_eq!(decode(EntityType::Folder, &record, None).unwrap(), entity);
    }

    #[test]
    fn test_encode_rejects_sub_millisecond_last_modified() {
        use chrono::TimeZone;

        let mut file = File::new(
            "a.txt",
            Uuid::new_v4(),
            Uuid::new_v4(),
            10,
            Utc::now(),
            "t8pLpJhwBkIXrRDpZ6iVZRA3Ff3ixhcYKAwMVc_D6ZU",
        );
        file.last_modified_date = Utc.timestamp_nanos(1_612_424_488_033_000_001);
        let entity = Entity {
            id: Uuid::new_v4(),
            transaction_id: None,
            transaction_owner_address: None,
            created_at: Utc.timestamp_opt(1_612_424_488, 0).unwrap(),
            data: file.into(),
        };

        match encode(&entity, Sealing::sealed(&drive_key())) {
            Err(EntityError::Validation(violations)) => {
                assert_eq!(violations.fields(), vec!["lastModifiedDate"]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_sealed_record_hides_payload() {
        let entity = folder();
        let key = drive_key();
        let record = encode(&entity, Sealing::sealed(&key)).unwrap();
        assert!(record.is_sealed());
        assert_eq!(record.tags.get(EntityTag::ContentType), Some("application/octet-stream"));
        assert!(!String::from_utf8_lossy(&record.data).contains("docs"));
        assert_eq!(
            record.tags.get(EntityTag::FolderId),
            Some(entity.id.to_string().as_str())
        );
        assert_eq!(decode(EntityType::Folder, &record, Some(&key)).unwrap(), entity);
    }

    #[test]
    fn test_file_sealed_with_file_key() {
        let key = drive_key();
        let file = File::new("a.txt", Uuid::new_v4(), Uuid::new_v4(), 5, Utc::now(), "tx");
        let entity = Entity::new(Uuid::new_v4(), file).unwrap();
        let record = encode(&entity, Sealing::sealed(&key)).unwrap();

        let file_key = derive_file_key(&key, entity.id).unwrap();
        assert!(open(&record.data, &record.tags, file_key.secret()).is_ok());
        assert!(matches!(
            open(&record.data, &record.tags, key.secret()),
            Err(EnvelopeError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_missing_key() {
        let key = drive_key();
        let record = encode(&folder(), Sealing::sealed(&key)).unwrap();
        assert!(matches!(
            decode(EntityType::Folder, &record, None),
            Err(EntityError::MissingDecryptionKey)
        ));
    }

    #[test]
    fn test_drive_privacy_must_match_sealing() {
        let key = drive_key();
        let public = Entity::new(Uuid::new_v4(), Drive::public("d", Uuid::new_v4())).unwrap();
        assert!(matches!(
            encode(&public, Sealing::sealed(&key)),
            Err(EntityError::Validation(_))
        ));

        let private = Entity::new(
            Uuid::new_v4(),
            Drive::private("d", Uuid::new_v4(), DriveAuthMode::Password),
        )
        .unwrap();
        assert!(matches!(
            encode(&private, Sealing::Unsealed),
            Err(EntityError::Validation(_))
        ));
    }

    #[test]
    fn test_entity_type_mismatch() {
        let record = encode(&folder(), Sealing::Unsealed).unwrap();
        match decode(EntityType::Drive, &record, None) {
            Err(EntityError::Validation(violations)) => {
                assert!(violations.contains("entityType"));
                assert!(violations.contains("rootFolderId"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_payload() {
        let mut record = encode(&folder(), Sealing::Unsealed).unwrap();
        for data in [&b"[1,2]"[..], b"not json", b"\"name\""] {
            record.data = data.to_vec();
            assert!(matches!(
                decode(EntityType::Folder, &record, None),
                Err(EntityError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn test_missing_and_non_numeric_time() {
        let mut record = encode(&folder(), Sealing::Unsealed).unwrap();
        record.tags.remove(EntityTag::UnixTime);
        match decode(EntityType::Folder, &record, None) {
            Err(EntityError::Validation(v)) => assert_eq!(v.fields(), vec!["createdAt"]),
            other => panic!("expected validation failure, got {:?}", other),
        }

        record.tags.insert(EntityTag::UnixTime, "noon");
        match decode(EntityType::Folder, &record, None) {
            Err(EntityError::Validation(v)) => assert_eq!(
                v.iter().next().map(|v| v.kind.clone()),
                Some(ViolationKind::NotANumber("noon".into()))
            ),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_sealing_from_option() {
        let key = drive_key();
        assert!(Sealing::from(Some(&key)).is_sealed());
        assert!(!Sealing::from(None::<&DriveKey>).is_sealed());
    }
}
