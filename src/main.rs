//! tablegen - Snapshot Resolution & Table Grouping
//!
//! Reads the entity schema snapshots left behind by infrastructure synthesis
//! or deployment, picks the authoritative ones, groups entities by the
//! physical table they live in and drives the code generator once per table:
//! - Discovery across the mode-partitioned and cache layouts
//! - Key consistency per table, field name collisions per entity
//! - Per-entity report; one broken table never aborts the others

mod cli;
mod config;
mod error;
mod grouping;
mod naming;
mod pipeline;
mod snapshot;
#[cfg(test)]
mod testing;

use crate::cli::Cli;
use crate::config::{LogFormat, Settings};
use crate::error::AppError;
use crate::pipeline::Orchestrator;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Some entity failed
const EXIT_FAILURES: u8 = 1;
/// No snapshot matched the filters
const EXIT_NOT_FOUND: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load()?;
    init_tracing(settings.log_format);

    let json = cli.json;
    let request = cli.into_request(&settings);
    info!(
        "Resolving snapshots under {} (mode={}, stack={})",
        request.snapshot_dir.display(),
        request.query.mode,
        request.query.stack.as_deref().unwrap_or("<any>")
    );

    let orchestrator = Orchestrator::with_defaults(settings.regions.clone());
    let report = match orchestrator.run(&request).await {
        Ok(report) => report,
        Err(AppError::NotFound(report)) => {
            eprintln!("{}", report);
            return Ok(ExitCode::from(EXIT_NOT_FOUND));
        }
        Err(e) => {
            error!("Generation aborted [{}]: {}", e.code(), e);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if report.has_failures() {
        error!("{} entity(ies) failed", report.failure_count());
        return Ok(ExitCode::from(EXIT_FAILURES));
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize tracing with structured logging on stderr
fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tablegen=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init(),
    }
}
