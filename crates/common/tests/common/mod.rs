//! Shared fixtures for entity and ledger integration tests
#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use common::crypto::{derive_drive_key, DriveAuthMode, DriveAuthParams, DriveKey, Ed25519Wallet};
use common::entity::{Drive, Entity, File, Folder};
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery staple";

/// A wallet, one drive owned by it, and that drive's key
pub struct Fixture {
    pub wallet: Ed25519Wallet,
    pub drive_id: Uuid,
    pub root_folder_id: Uuid,
    pub drive_key: DriveKey,
}

impl Fixture {
    pub fn new() -> Self {
        let wallet = Ed25519Wallet::generate();
        let drive_id = Uuid::new_v4();
        let drive_key =
            derive_drive_key(drive_id, &wallet, &DriveAuthParams::password(PASSWORD)).unwrap();
        Self {
            wallet,
            drive_id,
            root_folder_id: Uuid::new_v4(),
            drive_key,
        }
    }

    pub fn public_drive(&self) -> Entity {
        Entity::new(self.drive_id, Drive::public("Public Drive", self.root_folder_id)).unwrap()
    }

    pub fn private_drive(&self) -> Entity {
        Entity::new(
            self.drive_id,
            Drive::private("Private Drive", self.root_folder_id, DriveAuthMode::Password),
        )
        .unwrap()
    }

    pub fn root_folder(&self) -> Entity {
        Entity::new(self.root_folder_id, Folder::root("root", self.drive_id)).unwrap()
    }

    pub fn folder(&self, name: &str) -> Entity {
        Entity::new(
            Uuid::new_v4(),
            Folder::new(name, self.drive_id, self.root_folder_id),
        )
        .unwrap()
    }

    pub fn file(&self, name: &str) -> Entity {
        let last_modified = Utc.timestamp_millis_opt(1_612_424_488_033).unwrap();
        let file = File::new(
            name,
            self.drive_id,
            self.root_folder_id,
            1024,
            last_modified,
            "t8pLpJhwBkIXrRDpZ6iVZRA3Ff3ixhcYKAwMVc_D6ZU",
        )
        .with_content_type("text/plain");
        Entity::new(Uuid::new_v4(), file).unwrap()
    }
}

/// Install a test subscriber so `RUST_LOG=debug` shows codec logs
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
