//! Generation report
//!
//! One outcome per attempted entity, in table-group discovery order.

use crate::error::FailureDetail;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// What happened to one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EntityStatus {
    Generated,
    Skipped { reason: String },
    Failed(FailureDetail),
}

impl EntityStatus {
    fn marker(&self) -> &'static str {
        match self {
            EntityStatus::Generated => "✔",
            EntityStatus::Skipped { .. } => "–",
            EntityStatus::Failed(_) => "✘",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOutcome {
    pub entity: String,
    pub stack: String,
    /// Physical table name, when known
    pub table: Option<String>,
    pub source: PathBuf,
    /// SHA-256 of the snapshot file
    pub checksum: Option<String>,
    #[serde(flatten)]
    pub status: EntityStatus,
}

impl EntityOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, EntityStatus::Failed(_))
    }
}

/// Result of one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub outcomes: Vec<EntityOutcome>,
    pub tables_generated: usize,
    pub files_written: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(EntityOutcome::is_failure)
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn generated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == EntityStatus::Generated)
            .count()
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            write!(f, "{} {}", outcome.status.marker(), outcome.entity)?;
            if let Some(table) = &outcome.table {
                write!(f, " ({})", table)?;
            }
            match &outcome.status {
                EntityStatus::Generated => {}
                EntityStatus::Skipped { reason } => write!(f, ": {}", reason)?,
                EntityStatus::Failed(failure) => {
                    write!(f, ": [{}] {}", failure.code, failure.message)?
                }
            }
            writeln!(f)?;
        }

        write!(
            f,
            "{} generated, {} failed, {} table(s), {} file(s) written",
            self.generated_count(),
            self.failure_count(),
            self.tables_generated,
            self.files_written.len()
        )
    }
}
