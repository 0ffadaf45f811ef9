//! Command line interface
//!
//! Flags override values loaded by [`Settings::load`].

use crate::config::Settings;
use crate::naming::TargetLanguage;
use crate::pipeline::GenerationRequest;
use crate::snapshot::{ModeFilter, SnapshotQuery};
use clap::Parser;
use std::path::PathBuf;

/// Generate typed data-access code from entity schema snapshots
#[derive(Debug, Parser)]
#[command(name = "tablegen", version, about)]
pub struct Cli {
    /// Only consider snapshots of this stack
    #[arg(long)]
    pub stack: Option<String>,

    /// Snapshot provenance to use
    #[arg(long, value_enum, default_value_t = ModeFilter::Auto)]
    pub mode: ModeFilter,

    /// Root of the snapshot directory [env: SNAPSHOT_DIR]
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Where generated code is written [env: CODEGEN_OUTPUT_DIR]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Target language for identifiers [env: CODEGEN_LANGUAGE]
    #[arg(long, value_enum)]
    pub language: Option<TargetLanguage>,

    /// Package or namespace for generated code [env: CODEGEN_PACKAGE]
    #[arg(long)]
    pub package: Option<String>,

    /// Table groups generated concurrently [env: CODEGEN_JOBS]
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Print the report as JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Merge flags over settings
    pub fn into_request(self, settings: &Settings) -> GenerationRequest {
        GenerationRequest {
            snapshot_dir: self
                .snapshot_dir
                .unwrap_or_else(|| settings.snapshot_dir.clone()),
            query: SnapshotQuery {
                mode: self.mode,
                stack: self.stack.filter(|s| !s.trim().is_empty()),
            },
            output_dir: self.output_dir.unwrap_or_else(|| settings.output_dir.clone()),
            package: self.package.unwrap_or_else(|| settings.package.clone()),
            language: self.language.unwrap_or(settings.language),
            jobs: self.jobs.map(usize::from).unwrap_or(settings.jobs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_come_from_settings() {
        let cli = Cli::parse_from(["tablegen"]);
        let request = cli.into_request(&Settings::default());

        assert_eq!(request.snapshot_dir, PathBuf::from(".snapshots"));
        assert_eq!(request.query.mode, ModeFilter::Auto);
        assert_eq!(request.query.stack, None);
        assert_eq!(request.language, TargetLanguage::TypeScript);
        assert_eq!(request.jobs, 1);
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "tablegen",
            "--stack",
            "Backend",
            "--mode",
            "registered",
            "--snapshot-dir",
            "/tmp/snaps",
            "--language",
            "python",
            "--package",
            "app.models",
            "--jobs",
            "4",
        ]);
        let request = cli.into_request(&Settings::default());

        assert_eq!(request.query.stack.as_deref(), Some("Backend"));
        assert_eq!(request.query.mode, ModeFilter::Registered);
        assert_eq!(request.snapshot_dir, PathBuf::from("/tmp/snaps"));
        assert_eq!(request.language, TargetLanguage::Python);
        assert_eq!(request.package, "app.models");
        assert_eq!(request.jobs, 4);
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(Cli::try_parse_from(["tablegen", "--jobs", "0"]).is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["tablegen", "--mode", "draft"]).is_err());
    }
}
