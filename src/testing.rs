//! Shared fixtures for unit tests

use crate::snapshot::model::{
    KeySchema, ResolvedSnapshot, ResourceMetadata, SnapshotAction, SnapshotContext,
};
use crate::snapshot::store::SnapshotMode;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Write `content` at `root/rel`, creating parent directories
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Pin a file's mtime to a fixed instant minus `age_secs`
pub fn set_modified(path: &Path, age_secs: u64) {
    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(base - Duration::from_secs(age_secs)).unwrap();
}

fn schema_json(entity: &str, pk: Option<&str>, sk: Option<&str>) -> Value {
    let mut primary_key = serde_json::Map::new();
    let mut fields = Vec::new();
    if let Some(pk) = pk {
        primary_key.insert("partitionKey".to_string(), json!(pk));
        fields.push(json!({ "name": pk, "type": "string", "required": true }));
    }
    if let Some(sk) = sk {
        primary_key.insert("sortKey".to_string(), json!(sk));
        fields.push(json!({ "name": sk, "type": "string", "required": true }));
    }
    fields.push(json!({ "name": "name", "type": "string" }));

    json!({
        "name": entity,
        "primaryKey": primary_key,
        "fields": fields,
    })
}

/// Single-entity UPSERT snapshot document bound to `table`
pub fn entity_json(entity: &str, table: &str, pk: &str) -> String {
    json!({
        "action": "UPSERT",
        "entityName": entity,
        "schema": schema_json(entity, Some(pk), None),
        "resource": { "name": table },
    })
    .to_string()
}

/// In-memory resolved snapshot with no resource identifiers
pub fn snapshot(entity: &str, table: &str, pk: Option<&str>, sk: Option<&str>) -> ResolvedSnapshot {
    let schema = schema_json(entity, pk, sk);
    ResolvedSnapshot {
        source: PathBuf::from(format!("registered/{}.json", entity)),
        mode: SnapshotMode::Registered,
        checksum: String::new(),
        context: SnapshotContext {
            account: "111122223333".to_string(),
            region: "us-east-1".to_string(),
            stack_name: "App".to_string(),
        },
        datastore_type: "dynamodb".to_string(),
        entity_name: entity.to_string(),
        resource_name: table.to_string(),
        action: SnapshotAction::Upsert,
        key_schema: KeySchema::from_schema(&schema),
        schema: Some(schema),
        resource: ResourceMetadata {
            name: table.to_string(),
            arn: None,
            resource_id: None,
            region: None,
            partition_key: None,
            sort_key: None,
            global_secondary_indexes: Vec::new(),
            local_secondary_indexes: Vec::new(),
        },
    }
}
