use chrono::{Duration, Utc};
use cloudnuke_core::{GLOBAL_REGION, tags};
use cloudnuke_local::{InventoryDocument, InventoryStore, LocalResource, TypeSpec};
use std::path::PathBuf;
use tempfile::TempDir;

/// Inventory with one type of each flavor
pub fn sandbox() -> InventoryDocument {
    let mut document = InventoryDocument::new();
    document.regions = vec!["us-east-1".into(), "eu-west-1".into()];

    let mut role = TypeSpec::new("iam-role");
    role.global = true;
    role.teardown = vec![
        "detach-policies".into(),
        "delete-inline-policies".into(),
        "remove-from-profiles".into(),
    ];

    let mut keypair = TypeSpec::new("ec2-keypair");
    keypair.tracks_first_seen = true;

    let mut db = TypeSpec::new("rds-instance");
    db.async_delete = true;
    db.confirm_attempts = 5;
    db.confirm_interval_ms = 10;

    document.resource_types = vec![TypeSpec::new("ec2-instance"), keypair, db, role];

    let old = Utc::now() - Duration::days(30);
    document.resources = vec![
        LocalResource::new("i-1", "ec2-instance", "us-east-1")
            .with_name("test-web")
            .with_created_at(old),
        LocalResource::new("i-2", "ec2-instance", "us-east-1")
            .with_name("db-keep")
            .with_created_at(old),
        LocalResource::new("i-3", "ec2-instance", "eu-west-1")
            .with_created_at(old)
            .with_tag(tags::TAG_EXCLUDE, tags::TAG_EXCLUDE_VALUE),
        LocalResource::new("i-4", "ec2-instance", "eu-west-1").with_created_at(Utc::now()),
        LocalResource::new("key-1", "ec2-keypair", "us-east-1"),
        LocalResource::new("role/app", "iam-role", GLOBAL_REGION)
            .with_created_at(old)
            .with_attachments("detach-policies", &["arn:policy/read"])
            .with_attachments("delete-inline-policies", &["inline-1", "inline-2"])
            .with_attachments("remove-from-profiles", &["profile/app"]),
        {
            let mut db = LocalResource::new("db-1", "rds-instance", "eu-west-1").with_created_at(old);
            db.pending_polls = 2;
            db
        },
    ];
    document
}

/// Write `document` to a fresh temp dir
pub async fn write(document: &InventoryDocument) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join(".cloudnuke").join("inventory.json");
    InventoryStore::new(&path).save(document).await.unwrap();
    (temp_dir, path)
}
