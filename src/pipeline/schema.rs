//! Entity schema contract
//!
//! The structural shape an entity schema must have before it is handed to a
//! generator. Content rules beyond this shape belong to the validator
//! implementation plugged into the orchestrator.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::Validate;

#[derive(Error, Debug)]
pub enum SchemaValidationError {
    #[error("schema does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("{0}")]
    Rules(#[from] validator::ValidationErrors),

    #[error("{role} key '{key}' is not a declared field")]
    UndeclaredKey { role: &'static str, key: String },
}

/// Validates raw schema JSON into an [`EntitySchema`]
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, raw: &Value) -> Result<EntitySchema, SchemaValidationError>;
}

/// Primary key of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKey {
    #[validate(length(min = 1, message = "Partition key is required"))]
    #[serde(deserialize_with = "deserialize_key_name")]
    pub partition_key: String,

    #[validate(length(min = 1, message = "Sort key must not be empty"))]
    #[serde(default, deserialize_with = "deserialize_optional_key_name")]
    pub sort_key: Option<String>,
}

/// One field of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    #[validate(length(min = 1, message = "Field name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Field type is required"))]
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub required: bool,

    /// Everything else is passed through to the generator untouched
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// A validated entity schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    #[validate(length(min = 1, message = "Schema name is required"))]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[validate(nested)]
    pub primary_key: PrimaryKey,

    #[validate(length(min = 1, message = "At least one field is required"))]
    #[validate(nested)]
    pub fields: Vec<SchemaField>,
}

impl EntitySchema {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRef {
    Name(String),
    Attribute { name: String },
}

impl From<KeyRef> for String {
    fn from(key: KeyRef) -> Self {
        match key {
            KeyRef::Name(name) | KeyRef::Attribute { name } => name,
        }
    }
}

fn deserialize_key_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    KeyRef::deserialize(deserializer).map(String::from)
}

fn deserialize_optional_key_name<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<KeyRef>::deserialize(deserializer).map(|key| key.map(String::from))
}

/// Default validator: serde shape + `validator` rules + key/field agreement
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralSchemaValidator;

impl SchemaValidator for StructuralSchemaValidator {
    fn validate(&self, raw: &Value) -> Result<EntitySchema, SchemaValidationError> {
        let schema = EntitySchema::deserialize(raw)?;
        Validate::validate(&schema)?;

        let keys = [
            ("partition", Some(&schema.primary_key.partition_key)),
            ("sort", schema.primary_key.sort_key.as_ref()),
        ];
        for (role, key) in keys {
            if let Some(key) = key {
                if !schema.declares(key) {
                    return Err(SchemaValidationError::UndeclaredKey {
                        role,
                        key: key.clone(),
                    });
                }
            }
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn validate(raw: Value) -> Result<EntitySchema, SchemaValidationError> {
        StructuralSchemaValidator.validate(&raw)
    }

    #[test]
    fn test_valid_schema() {
        let schema = validate(json!({
            "name": "User",
            "version": 2,
            "primaryKey": { "partitionKey": "id", "sortKey": { "name": "createdAt" } },
            "fields": [
                { "name": "id", "type": "string", "required": true },
                { "name": "createdAt", "type": "number", "format": "epoch" }
            ]
        }))
        .unwrap();

        assert_eq!(schema.name, "User");
        assert_eq!(schema.primary_key.sort_key.as_deref(), Some("createdAt"));
        assert_eq!(schema.field_names(), vec!["id", "createdAt"]);
        assert_eq!(schema.fields[1].attributes.get("format"), Some(&json!("epoch")));
    }

    #[test]
    fn test_missing_primary_key_is_shape_error() {
        let err = validate(json!({ "name": "User", "fields": [{ "name": "id", "type": "string" }] }))
            .unwrap_err();
        assert!(matches!(err, SchemaValidationError::Shape(_)));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let err = validate(json!({
            "name": "User",
            "primaryKey": { "partitionKey": "id" },
            "fields": []
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaValidationError::Rules(_)));
    }

    #[test]
    fn test_empty_field_name_rejected() {
        let err = validate(json!({
            "name": "User",
            "primaryKey": { "partitionKey": "id" },
            "fields": [{ "name": "id", "type": "string" }, { "name": "", "type": "string" }]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaValidationError::Rules(_)));
    }

    #[test]
    fn test_undeclared_key_rejected() {
        let err = validate(json!({
            "name": "User",
            "primaryKey": { "partitionKey": "id", "sortKey": "createdAt" },
            "fields": [{ "name": "id", "type": "string" }]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "sort key 'createdAt' is not a declared field");
    }
}
