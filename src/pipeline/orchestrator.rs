//! Orchestrator - Drives one generation run
//!
//! Resolution and grouping happen once up front. Each table group is then
//! planned (key check, schema validation, name collisions) and handed to the
//! code generator on a blocking task. Failures stay scoped to the entity or
//! group that caused them.

use crate::config::RegionConfig;
use crate::error::{generation_failure, malformed, AppError};
use crate::grouping::{self, TableGroup};
use crate::naming::{detect_collisions, FieldNameResolver, TargetLanguage};
use crate::pipeline::generator::{CodeGenerator, ManifestGenerator, TableMetadata};
use crate::pipeline::report::{EntityOutcome, EntityStatus, GenerationReport};
use crate::pipeline::schema::{EntitySchema, SchemaValidator, StructuralSchemaValidator};
use crate::snapshot::{ResolvedSnapshot, SnapshotQuery, SnapshotResolver, SnapshotStore};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Everything one run needs besides the injected collaborators
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub snapshot_dir: PathBuf,
    pub query: SnapshotQuery,
    pub output_dir: PathBuf,
    pub package: String,
    pub language: TargetLanguage,
    /// Upper bound on concurrent generator calls
    pub jobs: usize,
}

/// Work prepared for one table group
struct TablePlan {
    table: String,
    metadata: Option<TableMetadata>,
    outcomes: Vec<EntityOutcome>,
    /// Indices into `outcomes` riding on the generator call
    pending: Vec<usize>,
    schemas: Vec<EntitySchema>,
}

impl TablePlan {
    fn fail_pending(&mut self, err: &AppError) {
        let failure = err.to_failure();
        for &index in &self.pending {
            self.outcomes[index].status = EntityStatus::Failed(failure.clone());
        }
    }
}

type GenerationTask = JoinHandle<Result<Vec<PathBuf>, AppError>>;

pub struct Orchestrator {
    regions: RegionConfig,
    validator: Arc<dyn SchemaValidator>,
    generator: Arc<dyn CodeGenerator>,
}

impl Orchestrator {
    pub fn new(
        regions: RegionConfig,
        validator: Arc<dyn SchemaValidator>,
        generator: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self {
            regions,
            validator,
            generator,
        }
    }

    /// Structural schema validation and the JSON manifest emitter
    pub fn with_defaults(regions: RegionConfig) -> Self {
        Self::new(
            regions,
            Arc::new(StructuralSchemaValidator),
            Arc::new(ManifestGenerator),
        )
    }

    /// Run the whole pipeline.
    ///
    /// Only [`AppError::NotFound`] and unexpected internal errors are
    /// returned as `Err`; everything else lands in the report.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationReport, AppError> {
        let store = SnapshotStore::open(&request.snapshot_dir);
        let resolution = SnapshotResolver::new(&store).resolve(&request.query)?;
        for file in &resolution.selected {
            debug!("Selected {} ({} layout)", file.path.display(), resolution.layout);
        }

        let mut report = GenerationReport::default();
        report
            .outcomes
            .extend(resolution.malformed.iter().map(malformed_outcome));

        let groups = grouping::group(resolution.snapshots, &self.regions);
        info!(
            "Generating {} table group(s) with {} job(s)",
            groups.len(),
            request.jobs.max(1)
        );

        let semaphore = Arc::new(Semaphore::new(request.jobs.max(1)));
        let mut scheduled: Vec<(TablePlan, Option<GenerationTask>)> = Vec::with_capacity(groups.len());

        for group in &groups {
            let mut plan = self.plan(group, request.language);
            let task = match plan.metadata.take() {
                Some(metadata) if !plan.schemas.is_empty() => {
                    let permit = Arc::clone(&semaphore)
                        .acquire_owned()
                        .await
                        .map_err(|e| AppError::Internal(format!("generation pool closed: {}", e)))?;
                    let generator = Arc::clone(&self.generator);
                    let schemas = std::mem::take(&mut plan.schemas);
                    let package = request.package.clone();
                    let output_dir = request.output_dir.clone();

                    Some(tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        generate_table(generator.as_ref(), &schemas, &package, &output_dir, &metadata)
                    }))
                }
                _ => None,
            };
            scheduled.push((plan, task));
        }

        for (mut plan, task) in scheduled {
            if let Some(task) = task {
                match task.await.map_err(|e| join_failure(&plan.table, e)).and_then(|r| r) {
                    Ok(files) => {
                        info!("Generated table {} ({} file(s))", plan.table, files.len());
                        report.tables_generated += 1;
                        report.files_written.extend(files);
                    }
                    Err(e) => {
                        warn!("{}", e);
                        plan.fail_pending(&e);
                    }
                }
            }
            report.outcomes.extend(plan.outcomes);
        }

        Ok(report)
    }

    /// Pure preparation of one group: key check, schema validation, naming
    fn plan(&self, group: &TableGroup, language: TargetLanguage) -> TablePlan {
        let table = group.table_name().to_string();
        let mut plan = TablePlan {
            table: table.clone(),
            metadata: TableMetadata::from_group(group, &self.regions),
            outcomes: Vec::with_capacity(group.members.len()),
            pending: Vec::new(),
            schemas: Vec::new(),
        };

        let key_check = grouping::validate(group).map_err(AppError::KeyInconsistency);
        if let Err(e) = &key_check {
            warn!("{}", e);
        }

        for member in &group.members {
            let status = if member.is_delete() {
                EntityStatus::Skipped {
                    reason: "marked for deletion".to_string(),
                }
            } else if let Err(e) = &key_check {
                EntityStatus::Failed(e.to_failure())
            } else {
                match self.prepare_entity(member, language) {
                    Ok(schema) => {
                        plan.schemas.push(schema);
                        plan.pending.push(plan.outcomes.len());
                        EntityStatus::Generated
                    }
                    Err(e) => {
                        warn!("{}", e);
                        EntityStatus::Failed(e.to_failure())
                    }
                }
            };

            plan.outcomes.push(EntityOutcome {
                entity: member.entity_name.clone(),
                stack: member.context.stack_name.clone(),
                table: Some(table.clone()),
                source: member.source.clone(),
                checksum: Some(member.checksum.clone()),
                status,
            });
        }

        debug!(
            "Planned table {} ({}): {} of {} entities ready",
            table,
            group.identity,
            plan.schemas.len(),
            group.members.len()
        );
        plan
    }

    fn prepare_entity(
        &self,
        member: &ResolvedSnapshot,
        language: TargetLanguage,
    ) -> Result<EntitySchema, AppError> {
        let raw = member
            .schema
            .as_ref()
            .ok_or_else(|| malformed(&member.source, "`schema` is required for UPSERT snapshots"))?;

        let schema = self
            .validator
            .validate(raw)
            .map_err(|source| AppError::InvalidSchema {
                entity: member.entity_name.clone(),
                source,
            })?;

        let mappings = FieldNameResolver::new(language).resolve(&schema.field_names());
        let collisions = detect_collisions(&mappings);
        if !collisions.is_empty() {
            return Err(AppError::NameCollision {
                entity: member.entity_name.clone(),
                collisions,
            });
        }

        Ok(schema)
    }
}

fn generate_table(
    generator: &dyn CodeGenerator,
    schemas: &[EntitySchema],
    package: &str,
    output_dir: &Path,
    metadata: &TableMetadata,
) -> Result<Vec<PathBuf>, AppError> {
    generator
        .generate(schemas, package, output_dir, metadata)
        .map_err(|e| match e {
            AppError::GenerationFailure { .. } => e,
            other => generation_failure(&metadata.table_name, other.to_string()),
        })
}

fn join_failure(table: &str, err: JoinError) -> AppError {
    let reason = if err.is_panic() {
        format!("generator panicked: {}", panic_message(err.into_panic()))
    } else {
        format!("generator task did not complete: {}", err)
    };
    generation_failure(table, reason)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn malformed_outcome(err: &AppError) -> EntityOutcome {
    let source = match err {
        AppError::MalformedSnapshot { path, .. } => path.clone(),
        _ => PathBuf::new(),
    };
    let entity = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<unknown>".to_string());

    EntityOutcome {
        entity,
        stack: String::new(),
        table: None,
        source,
        checksum: None,
        status: EntityStatus::Failed(err.to_failure()),
    }
}
