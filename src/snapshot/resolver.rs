//! Snapshot Resolver
//!
//! Picks the authoritative snapshot(s) out of everything the store found.
//!
//! Mode-partitioned roots are single-pick: registered snapshots strictly
//! dominate preview ones, the newest file wins and the path breaks ties.
//! Cache roots are resolve-all: every file matching the stack filter is
//! returned.

use crate::error::AppError;
use crate::snapshot::model::{parse_snapshot_file, ResolvedSnapshot};
use crate::snapshot::store::{SnapshotFileInfo, SnapshotLayout, SnapshotMode, SnapshotStore};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Upper bound on names listed in "not found" diagnostics
pub const MAX_LISTED: usize = 10;

/// Requested mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeFilter {
    /// Registered if any exists, otherwise preview
    #[default]
    Auto,
    Preview,
    Registered,
}

impl ModeFilter {
    /// Modes to try, in priority order
    fn precedence(self) -> &'static [SnapshotMode] {
        match self {
            ModeFilter::Auto => &[SnapshotMode::Registered, SnapshotMode::Preview],
            ModeFilter::Preview => &[SnapshotMode::Preview],
            ModeFilter::Registered => &[SnapshotMode::Registered],
        }
    }
}

impl fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeFilter::Auto => write!(f, "auto"),
            ModeFilter::Preview => write!(f, "preview"),
            ModeFilter::Registered => write!(f, "registered"),
        }
    }
}

/// Filters applied to discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub mode: ModeFilter,
    pub stack: Option<String>,
}

impl SnapshotQuery {
    fn matches_stack(&self, file: &SnapshotFileInfo) -> bool {
        self.stack.as_deref().map_or(true, |stack| file.stack == stack)
    }
}

/// Outcome of a successful resolution
#[derive(Debug)]
pub struct Resolution {
    pub layout: SnapshotLayout,
    /// Files chosen, in discovery order
    pub selected: Vec<SnapshotFileInfo>,
    pub snapshots: Vec<ResolvedSnapshot>,
    /// Files or entities that could not be normalized
    pub malformed: Vec<AppError>,
}

/// Diagnostics for a resolution that matched nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundReport {
    pub root: PathBuf,
    pub root_exists: bool,
    pub layout: SnapshotLayout,
    pub expected_shape: String,
    pub mode: ModeFilter,
    pub stack: Option<String>,
    pub available_stacks: Vec<String>,
    pub more_stacks: usize,
    pub available_entities: Vec<String>,
    pub more_entities: usize,
}

impl NotFoundReport {
    fn build(store: &SnapshotStore, query: &SnapshotQuery, files: &[SnapshotFileInfo]) -> Self {
        let stacks: BTreeSet<String> = files
            .iter()
            .map(|f| match f.mode {
                SnapshotMode::Cached => f.stack.clone(),
                mode => format!("{} ({})", f.stack, mode),
            })
            .collect();
        let entities: BTreeSet<String> = files
            .iter()
            .filter_map(|f| f.resource_id.as_ref().map(|id| format!("{}/{}", f.stack, id)))
            .collect();

        let (available_stacks, more_stacks) = capped(stacks);
        let (available_entities, more_entities) = capped(entities);

        Self {
            root: store.root().to_path_buf(),
            root_exists: store.exists(),
            layout: store.layout(),
            expected_shape: store.expected_shape(),
            mode: query.mode,
            stack: query.stack.clone(),
            available_stacks,
            more_stacks,
            available_entities,
            more_entities,
        }
    }
}

fn capped(names: BTreeSet<String>) -> (Vec<String>, usize) {
    let total = names.len();
    let listed: Vec<String> = names.into_iter().take(MAX_LISTED).collect();
    let more = total - listed.len();
    (listed, more)
}

impl fmt::Display for NotFoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root_exists {
            writeln!(
                f,
                "No matching snapshot found under {} ({} layout)",
                self.root.display(),
                self.layout
            )?;
        } else {
            writeln!(f, "No matching snapshot found under {}", self.root.display())?;
        }
        writeln!(f, "  expected path: {}", self.expected_shape)?;
        writeln!(
            f,
            "  filters: mode={}, stack={}",
            self.mode,
            self.stack.as_deref().unwrap_or("<any>")
        )?;

        if !self.root_exists {
            writeln!(f, "  snapshot directory does not exist")?;
        } else if self.available_stacks.is_empty() {
            writeln!(f, "  no snapshots exist under this directory")?;
        } else {
            write_list(f, "available stacks", &self.available_stacks, self.more_stacks)?;
            if !self.available_entities.is_empty() {
                write_list(f, "available entities", &self.available_entities, self.more_entities)?;
            }
        }

        write!(
            f,
            "  hint: re-run the deployment or synthesis that writes snapshots, or adjust --stack / --mode / --snapshot-dir"
        )
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, names: &[String], more: usize) -> fmt::Result {
    write!(f, "  {}: {}", label, names.join(", "))?;
    if more > 0 {
        write!(f, " ... and {} more", more)?;
    }
    writeln!(f)
}

/// Newest by modification time; the lexically smallest path wins a tie
fn newest<'f>(candidates: impl Iterator<Item = &'f SnapshotFileInfo>) -> Option<&'f SnapshotFileInfo> {
    candidates.max_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| b.path.cmp(&a.path))
    })
}

/// Single-pick selection for the mode-partitioned layout
pub fn select_authoritative<'f>(
    files: &'f [SnapshotFileInfo],
    query: &SnapshotQuery,
) -> Option<&'f SnapshotFileInfo> {
    query.mode.precedence().iter().find_map(|mode| {
        newest(
            files
                .iter()
                .filter(|f| f.mode == *mode)
                .filter(|f| query.matches_stack(f)),
        )
    })
}

/// Resolve-all selection for the cache layout
pub fn select_matching<'f>(
    files: &'f [SnapshotFileInfo],
    query: &SnapshotQuery,
) -> Vec<&'f SnapshotFileInfo> {
    files.iter().filter(|f| query.matches_stack(f)).collect()
}

/// Resolver over one snapshot store
pub struct SnapshotResolver<'a> {
    store: &'a SnapshotStore,
}

impl<'a> SnapshotResolver<'a> {
    pub fn new(store: &'a SnapshotStore) -> Self {
        Self { store }
    }

    /// Resolve the authoritative snapshots for a query.
    ///
    /// Returns [`AppError::NotFound`] with diagnostics when nothing matches.
    pub fn resolve(&self, query: &SnapshotQuery) -> Result<Resolution, AppError> {
        let files = self.store.list();
        let layout = self.store.layout();

        let selected: Vec<SnapshotFileInfo> = match layout {
            SnapshotLayout::ModePartitioned => select_authoritative(&files, query)
                .into_iter()
                .cloned()
                .collect(),
            SnapshotLayout::Cache => {
                if query.mode != ModeFilter::Auto {
                    warn!(
                        "Mode filter '{}' does not apply to the cache layout; resolving all snapshots",
                        query.mode
                    );
                }
                select_matching(&files, query).into_iter().cloned().collect()
            }
        };

        if selected.is_empty() {
            return Err(AppError::NotFound(Box::new(NotFoundReport::build(
                self.store, query, &files,
            ))));
        }

        let mut snapshots = Vec::new();
        let mut malformed = Vec::new();

        for file in &selected {
            debug!(
                "Loading {} snapshot {} (provider={}, event={})",
                file.mode,
                file.path.display(),
                file.provider.as_deref().unwrap_or("-"),
                file.event_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
            );
            let bytes = match self.store.read(file) {
                Ok(bytes) => bytes,
                Err(e) => {
                    malformed.push(crate::error::malformed(&file.path, e.to_string()));
                    continue;
                }
            };

            for result in parse_snapshot_file(file, &bytes) {
                match result {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(e) => {
                        warn!("{}", e);
                        malformed.push(e);
                    }
                }
            }
        }

        info!(
            "Resolved {} entity snapshot(s) from {} file(s) ({} malformed)",
            snapshots.len(),
            selected.len(),
            malformed.len()
        );

        Ok(Resolution {
            layout,
            selected,
            snapshots,
            malformed,
        })
    }
}
