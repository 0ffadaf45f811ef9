//! Snapshot payload model
//!
//! Snapshot JSON is loosely typed: the resource block has a legacy name
//! (`dataStore`), context fields live at several levels, and mode-layout
//! files may hold a whole stack of entities. Everything is normalized here
//! into one [`ResolvedSnapshot`] shape.

use crate::config::{is_declared, RegionConfig};
use crate::error::{malformed, AppError};
use crate::snapshot::store::{SnapshotFileInfo, SnapshotMode};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_DATASTORE_TYPE: &str = "dynamodb";
const UNKNOWN: &str = "unknown";

/// What the producer intends for the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SnapshotAction {
    #[default]
    #[serde(rename = "UPSERT")]
    Upsert,
    #[serde(rename = "DELETE")]
    Delete,
}

const ACTION_VARIANTS: &[&str] = &["UPSERT", "DELETE"];

impl<'de> Deserialize<'de> for SnapshotAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let action = raw.trim();
        if action.eq_ignore_ascii_case("UPSERT") {
            Ok(SnapshotAction::Upsert)
        } else if action.eq_ignore_ascii_case("DELETE") {
            Ok(SnapshotAction::Delete)
        } else {
            Err(de::Error::unknown_variant(action, ACTION_VARIANTS))
        }
    }
}

/// A key attribute of the physical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAttribute {
    pub name: String,
    #[serde(rename = "type", alias = "attributeType", default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<String>,
}

/// Global or local secondary index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryIndex {
    pub index_name: String,
    #[serde(default)]
    pub partition_key: Option<KeyAttribute>,
    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,
    #[serde(default)]
    pub projection_type: Option<String>,
}

/// Physical resource block (`resource`, legacy `dataStore`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default, alias = "identifier")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub partition_key: Option<KeyAttribute>,
    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,
    #[serde(default)]
    pub global_secondary_indexes: Vec<SecondaryIndex>,
    #[serde(default)]
    pub local_secondary_indexes: Vec<SecondaryIndex>,
}

/// Partition and sort key field names declared by an entity schema.
/// `None` is a value in its own right: "no sort key" differs from any name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySchema {
    pub partition_key: Option<String>,
    pub sort_key: Option<String>,
}

impl KeySchema {
    /// Read `primaryKey.partitionKey` / `primaryKey.sortKey` from a raw schema.
    /// Keys may be plain strings or `{ "name": ... }` objects.
    pub fn from_schema(schema: &Value) -> Self {
        let primary_key = schema.get("primaryKey");
        Self {
            partition_key: primary_key
                .and_then(|pk| pk.get("partitionKey"))
                .and_then(key_name),
            sort_key: primary_key
                .and_then(|pk| pk.get("sortKey"))
                .and_then(key_name),
        }
    }
}

fn key_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.clone()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

impl fmt::Display for KeySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |key: &Option<String>| match key {
            Some(name) => format!("'{}'", name),
            None => "<none>".to_string(),
        };
        write!(
            f,
            "partition key {}, sort key {}",
            show(&self.partition_key),
            show(&self.sort_key)
        )
    }
}

/// Owning account / region / stack as declared by the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotContext {
    pub account: String,
    /// Raw declared region; may be the `unknown` sentinel
    pub region: String,
    pub stack_name: String,
}

/// A parsed, authoritative snapshot of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSnapshot {
    pub source: PathBuf,
    pub mode: SnapshotMode,
    pub checksum: String,
    pub context: SnapshotContext,
    pub datastore_type: String,
    pub entity_name: String,
    pub resource_name: String,
    pub action: SnapshotAction,
    /// Raw schema, always `None` for `DELETE`
    pub schema: Option<Value>,
    pub key_schema: KeySchema,
    pub resource: ResourceMetadata,
}

impl ResolvedSnapshot {
    pub fn is_delete(&self) -> bool {
        self.action == SnapshotAction::Delete
    }

    /// Region of the bound table.
    ///
    /// A declared resource region wins; otherwise the context region goes
    /// through the fallback policy. Grouping and table metadata both read
    /// this so they never disagree.
    pub fn effective_region(&self, regions: &RegionConfig) -> String {
        match self.resource.region.as_deref() {
            Some(declared) if is_declared(declared) => declared.trim().to_string(),
            _ => regions.resolve(Some(self.context.region.as_str())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContext {
    #[serde(default, alias = "accountId")]
    account: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default, alias = "stack")]
    stack_name: Option<String>,
}

impl RawContext {
    /// Fill gaps from a parent context
    fn or(self, parent: &RawContext) -> RawContext {
        RawContext {
            account: self.account.or_else(|| parent.account.clone()),
            region: self.region.or_else(|| parent.region.clone()),
            stack_name: self.stack_name.or_else(|| parent.stack_name.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntitySnapshot {
    #[serde(default)]
    action: SnapshotAction,
    #[serde(default)]
    entity_name: Option<String>,
    #[serde(default, alias = "dataStoreType")]
    datastore_type: Option<String>,
    #[serde(default)]
    resource_name: Option<String>,
    #[serde(default)]
    context: Option<RawContext>,
    #[serde(flatten)]
    inline_context: RawContext,
    #[serde(default)]
    schema: Option<Value>,
    #[serde(default, alias = "dataStore")]
    resource: Option<ResourceMetadata>,
}

/// SHA-256 of the file content, hex encoded
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Parse one snapshot file into resolved entities.
///
/// A file-level failure (unreadable JSON) yields a single error; a stack
/// document yields one result per entity so one bad entity does not hide
/// its siblings.
pub fn parse_snapshot_file(
    info: &SnapshotFileInfo,
    bytes: &[u8],
) -> Vec<Result<ResolvedSnapshot, AppError>> {
    let checksum = compute_checksum(bytes);

    let document: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => return vec![Err(malformed(&info.path, format!("invalid JSON: {}", e)))],
    };

    let parent_context = RawContext {
        account: info.account.clone(),
        region: info.region.clone(),
        stack_name: Some(info.stack.clone()),
    };

    match document.get("entities") {
        Some(Value::Array(entities)) => {
            let stack_context = match RawContext::deserialize(&document) {
                Ok(ctx) => ctx.or(&parent_context),
                Err(e) => return vec![Err(malformed(&info.path, format!("invalid stack context: {}", e)))],
            };
            entities
                .iter()
                .map(|entity| normalize_entity(info, &checksum, entity, &stack_context))
                .collect()
        }
        Some(_) => vec![Err(malformed(&info.path, "`entities` must be an array"))],
        None => vec![normalize_entity(info, &checksum, &document, &parent_context)],
    }
}

fn normalize_entity(
    info: &SnapshotFileInfo,
    checksum: &str,
    value: &Value,
    parent: &RawContext,
) -> Result<ResolvedSnapshot, AppError> {
    let raw = RawEntitySnapshot::deserialize(value)
        .map_err(|e| malformed(&info.path, format!("invalid snapshot payload: {}", e)))?;

    let resource = raw.resource.ok_or_else(|| {
        malformed(&info.path, "missing resource metadata block (`resource` or `dataStore`)")
    })?;
    if resource.name.trim().is_empty() {
        return Err(malformed(&info.path, "resource metadata has an empty `name`"));
    }

    let schema = match (raw.action, raw.schema) {
        (SnapshotAction::Upsert, None) | (SnapshotAction::Upsert, Some(Value::Null)) => {
            return Err(malformed(&info.path, "`schema` is required for UPSERT snapshots"));
        }
        (SnapshotAction::Upsert, Some(schema)) => Some(schema),
        (SnapshotAction::Delete, None) | (SnapshotAction::Delete, Some(Value::Null)) => None,
        (SnapshotAction::Delete, Some(_)) => {
            warn!("Dropping schema from DELETE snapshot {}", info.path.display());
            None
        }
    };

    let entity_name = raw
        .entity_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            schema
                .as_ref()
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| info.resource_id.clone())
        .ok_or_else(|| malformed(&info.path, "cannot determine entity name"))?;

    let context = raw
        .context
        .unwrap_or_default()
        .or(&raw.inline_context)
        .or(parent);

    let key_schema = schema.as_ref().map(KeySchema::from_schema).unwrap_or_default();

    Ok(ResolvedSnapshot {
        source: info.path.clone(),
        mode: info.mode,
        checksum: checksum.to_string(),
        context: SnapshotContext {
            account: context.account.unwrap_or_else(|| UNKNOWN.to_string()),
            region: context.region.unwrap_or_else(|| UNKNOWN.to_string()),
            stack_name: context.stack_name.unwrap_or_else(|| info.stack.clone()),
        },
        datastore_type: raw
            .datastore_type
            .or_else(|| info.datastore_type.clone())
            .unwrap_or_else(|| DEFAULT_DATASTORE_TYPE.to_string()),
        entity_name,
        resource_name: raw.resource_name.unwrap_or_else(|| resource.name.clone()),
        action: raw.action,
        schema,
        key_schema,
        resource,
    })
}
