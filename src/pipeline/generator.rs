//! Code generator contract
//!
//! The generator is called once per physical table with every entity schema
//! bound to it. Templates live outside this crate; [`ManifestGenerator`] is
//! the built-in emitter that writes one JSON manifest per table.

use crate::config::RegionConfig;
use crate::error::{generation_failure, AppError};
use crate::grouping::{is_unresolved, TableGroup};
use crate::pipeline::schema::EntitySchema;
use crate::snapshot::model::compute_checksum;
use crate::snapshot::{KeyAttribute, SecondaryIndex};
use heck::ToSnakeCase;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Description of the physical table handed to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub table_name: String,
    /// Grouping identity (resource id, ARN or `account:region:name`)
    pub identity: String,
    /// ARN or resource id, only when fully resolved
    pub identifier: Option<String>,
    pub region: String,
    pub partition_key: Option<KeyAttribute>,
    pub sort_key: Option<KeyAttribute>,
    pub global_secondary_indexes: Vec<SecondaryIndex>,
    pub local_secondary_indexes: Vec<SecondaryIndex>,
}

impl TableMetadata {
    /// Build from the group's first member carrying resource metadata
    pub fn from_group(group: &TableGroup, regions: &RegionConfig) -> Option<Self> {
        let source = group.metadata_source()?;
        let resource = &source.resource;

        let identifier = resource
            .arn
            .as_deref()
            .filter(|arn| !is_unresolved(arn))
            .or_else(|| resource.resource_id.as_deref().filter(|id| !is_unresolved(id)))
            .map(str::to_string);

        Some(Self {
            table_name: resource.name.clone(),
            identity: group.identity.to_string(),
            identifier,
            region: source.effective_region(regions),
            partition_key: resource.partition_key.clone(),
            sort_key: resource.sort_key.clone(),
            global_secondary_indexes: resource.global_secondary_indexes.clone(),
            local_secondary_indexes: resource.local_secondary_indexes.clone(),
        })
    }

    /// File-system safe name for this table's output
    pub fn slug(&self) -> String {
        let slug = self.table_name.to_snake_case();
        if slug.is_empty() {
            "table".to_string()
        } else {
            slug
        }
    }

    /// Output file stem, unique per table identity.
    ///
    /// Same-named tables in other accounts or regions, and names that share
    /// a slug, get distinct stems.
    pub fn file_stem(&self) -> String {
        let digest = compute_checksum(self.identity.as_bytes());
        format!("{}-{}", self.slug(), &digest[..8])
    }
}

/// External code emitter
pub trait CodeGenerator: Send + Sync {
    /// Emit code for every schema bound to one table, returning written files
    fn generate(
        &self,
        schemas: &[EntitySchema],
        package: &str,
        output_dir: &Path,
        table: &TableMetadata,
    ) -> Result<Vec<PathBuf>, AppError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableManifest<'a> {
    generator: &'static str,
    package: &'a str,
    table: &'a TableMetadata,
    entities: &'a [EntitySchema],
}

/// Writes `<output_dir>/<table_slug>-<identity_hash>.json`
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestGenerator;

impl CodeGenerator for ManifestGenerator {
    fn generate(
        &self,
        schemas: &[EntitySchema],
        package: &str,
        output_dir: &Path,
        table: &TableMetadata,
    ) -> Result<Vec<PathBuf>, AppError> {
        if schemas.is_empty() {
            return Err(generation_failure(&table.table_name, "no schemas to generate"));
        }

        fs::create_dir_all(output_dir)?;

        let manifest = TableManifest {
            generator: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")),
            package,
            table,
            entities: schemas,
        };
        let path = output_dir.join(format!("{}.json", table.file_stem()));
        let body = serde_json::to_vec_pretty(&manifest)?;
        fs::write(&path, body)?;

        debug!("Wrote manifest {} ({} entities)", path.display(), schemas.len());
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::grouper::TableIdentity;
    use crate::pipeline::schema::{SchemaValidator, StructuralSchemaValidator};
    use crate::snapshot::model::SnapshotAction;
    use crate::testing::snapshot;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn users_group() -> TableGroup {
        let mut user = snapshot("User", "Users", Some("id"), None);
        user.resource.arn = Some("arn:aws:dynamodb:us-east-1:1:table/Users".to_string());
        user.resource.partition_key = Some(KeyAttribute {
            name: "id".to_string(),
            attribute_type: Some("S".to_string()),
        });
        TableGroup {
            identity: TableIdentity::Arn("arn:aws:dynamodb:us-east-1:1:table/Users".to_string()),
            members: vec![user],
        }
    }

    #[test]
    fn test_metadata_from_group() {
        let metadata = TableMetadata::from_group(&users_group(), &RegionConfig::default()).unwrap();
        assert_eq!(metadata.table_name, "Users");
        assert_eq!(
            metadata.identifier.as_deref(),
            Some("arn:aws:dynamodb:us-east-1:1:table/Users")
        );
        assert_eq!(metadata.region, "us-east-1");
        assert_eq!(metadata.partition_key.unwrap().name, "id");
    }

    #[test]
    fn test_resource_and_context_regions_resolve_independently() {
        let mut group = users_group();
        group.members[0].context.region = "unknown".to_string();
        group.members[0].resource.region = Some("ap-southeast-2".to_string());
        let regions = RegionConfig::new(Some("eu-west-1".to_string()), "us-east-1");

        let metadata = TableMetadata::from_group(&group, &regions).unwrap();
        assert_eq!(metadata.region, "ap-southeast-2");

        group.members[0].resource.region = Some("unknown".to_string());
        let metadata = TableMetadata::from_group(&group, &regions).unwrap();
        assert_eq!(metadata.region, "eu-west-1");
    }

    #[test]
    fn test_placeholder_identifier_is_dropped() {
        let mut group = users_group();
        group.members[0].resource.arn = Some("${Token[TOKEN.9]}".to_string());
        let metadata = TableMetadata::from_group(&group, &RegionConfig::default()).unwrap();
        assert_eq!(metadata.identifier, None);
    }

    #[test]
    fn test_metadata_skips_deleted_first_member() {
        let mut group = users_group();
        let mut legacy = snapshot("Legacy", "LegacyName", None, None);
        legacy.action = SnapshotAction::Delete;
        legacy.schema = None;
        group.members.insert(0, legacy);

        let metadata = TableMetadata::from_group(&group, &RegionConfig::default()).unwrap();
        assert_eq!(metadata.table_name, "Users");
    }

    #[test]
    fn test_manifest_generator_writes_one_file_per_table() {
        let dir = TempDir::new().unwrap();
        let group = users_group();
        let metadata = TableMetadata::from_group(&group, &RegionConfig::default()).unwrap();
        let schema = StructuralSchemaValidator
            .validate(group.members[0].schema.as_ref().unwrap())
            .unwrap();

        let written = ManifestGenerator
            .generate(&[schema], "models", dir.path(), &metadata)
            .unwrap();

        assert_eq!(written, vec![dir.path().join(format!("{}.json", metadata.file_stem()))]);
        assert!(metadata.file_stem().starts_with("users-"));
        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(&written[0]).unwrap()).unwrap();
        assert_eq!(manifest["package"], "models");
        assert_eq!(manifest["table"]["tableName"], "Users");
        assert_eq!(manifest["entities"][0]["name"], "User");
    }

    #[test]
    fn test_file_stem_differs_per_identity() {
        let regions = RegionConfig::default();
        let east = TableMetadata::from_group(&users_group(), &regions).unwrap();

        let mut west_group = users_group();
        west_group.identity = TableIdentity::Arn("arn:aws:dynamodb:eu-west-1:1:table/Users".to_string());
        let west = TableMetadata::from_group(&west_group, &regions).unwrap();

        let mut lower_group = users_group();
        lower_group.members[0].resource.name = "users".to_string();
        lower_group.identity = TableIdentity::Composite("1:us-east-1:users".to_string());
        let lower = TableMetadata::from_group(&lower_group, &regions).unwrap();

        assert_eq!(east.slug(), west.slug());
        assert_eq!(east.slug(), lower.slug());
        assert_ne!(east.file_stem(), west.file_stem());
        assert_ne!(east.file_stem(), lower.file_stem());
        assert_eq!(east.file_stem(), east.clone().file_stem());
    }

    #[test]
    fn test_manifest_generator_rejects_empty_schema_list() {
        let dir = TempDir::new().unwrap();
        let metadata = TableMetadata::from_group(&users_group(), &RegionConfig::default()).unwrap();
        let err = ManifestGenerator
            .generate(&[], "models", dir.path(), &metadata)
            .unwrap_err();
        assert_eq!(err.code(), "GENERATION_FAILURE");
    }
}
