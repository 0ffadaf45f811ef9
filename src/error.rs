//! Error handling module
//!
//! Provides the error taxonomy for the whole generation run. Every variant
//! carries a stable code so failures can be rendered in the summary and in
//! the JSON report without leaking a stack trace.

use crate::config::ConfigError;
use crate::grouping::KeyMismatch;
use crate::naming::Collision;
use crate::pipeline::schema::SchemaValidationError;
use crate::snapshot::NotFoundReport;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(Box<NotFoundReport>),

    #[error("{0}")]
    KeyInconsistency(KeyMismatch),

    #[error("Entity '{entity}' has {} field name collision(s): {}", .collisions.len(), describe_collisions(.collisions))]
    NameCollision {
        entity: String,
        collisions: Vec<Collision>,
    },

    #[error("Malformed snapshot {}: {reason}", .path.display())]
    MalformedSnapshot { path: PathBuf, reason: String },

    #[error("Invalid schema for entity '{entity}': {source}")]
    InvalidSchema {
        entity: String,
        #[source]
        source: SchemaValidationError,
    },

    #[error("Generation failed for table {table}: {reason}")]
    GenerationFailure { table: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure entry attached to an entity in the generation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    /// Stable, machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::KeyInconsistency(_) => "KEY_INCONSISTENCY",
            AppError::NameCollision { .. } => "NAME_COLLISION",
            AppError::MalformedSnapshot { .. } => "MALFORMED_SNAPSHOT",
            AppError::InvalidSchema { .. } => "INVALID_SCHEMA",
            AppError::GenerationFailure { .. } => "GENERATION_FAILURE",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error only affects one entity or one table group.
    /// Scoped errors are recorded in the report; everything else ends the run.
    pub fn is_scoped(&self) -> bool {
        matches!(
            self,
            AppError::KeyInconsistency(_)
                | AppError::NameCollision { .. }
                | AppError::MalformedSnapshot { .. }
                | AppError::InvalidSchema { .. }
                | AppError::GenerationFailure { .. }
        )
    }

    /// Downgrade into a report entry
    pub fn to_failure(&self) -> FailureDetail {
        if !self.is_scoped() {
            error!("Unscoped error recorded as entity failure: {:?}", self);
        }

        FailureDetail {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

fn describe_collisions(collisions: &[Collision]) -> String {
    collisions
        .iter()
        .map(|c| c.explanation.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Helper function to create a malformed snapshot error
pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> AppError {
    AppError::MalformedSnapshot {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Helper function to create a generation failure
pub fn generation_failure(table: impl Into<String>, reason: impl Into<String>) -> AppError {
    AppError::GenerationFailure {
        table: table.into(),
        reason: reason.into(),
    }
}
