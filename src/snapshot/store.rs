//! Snapshot Store
//!
//! Discovers snapshot files on disk. Two historical layouts exist and each is
//! a [`LayoutStrategy`]; the store picks one per root directory and nothing
//! downstream of discovery knows which one was used.
//!
//! ```text
//! mode-partitioned:  root/{preview|registered}/<stack>[-<eventId>].json
//! cache:             root/<provider>/<account>/<region>/<stack>/<datastoreType>/<resourceId>.json
//! ```

use crate::error::AppError;
use crate::snapshot::filename;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};

pub const PREVIEW_DIR: &str = "preview";
pub const REGISTERED_DIR: &str = "registered";

/// Number of path components below the root in the cache layout
const CACHE_DEPTH: usize = 6;

/// Provenance of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    /// Speculative, produced before deployment
    Preview,
    /// Deployed and authoritative
    Registered,
    /// Implicit single mode of the cache layout
    Cached,
}

impl fmt::Display for SnapshotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotMode::Preview => write!(f, "preview"),
            SnapshotMode::Registered => write!(f, "registered"),
            SnapshotMode::Cached => write!(f, "cached"),
        }
    }
}

/// On-disk layout of a snapshot root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotLayout {
    ModePartitioned,
    Cache,
}

impl fmt::Display for SnapshotLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotLayout::ModePartitioned => write!(f, "mode-partitioned"),
            SnapshotLayout::Cache => write!(f, "cache"),
        }
    }
}

/// One snapshot file found on disk (never persisted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFileInfo {
    pub path: PathBuf,
    pub mode: SnapshotMode,
    pub stack: String,
    pub provider: Option<String>,
    pub account: Option<String>,
    pub region: Option<String>,
    pub datastore_type: Option<String>,
    pub resource_id: Option<String>,
    pub event_id: Option<Uuid>,
    pub modified: DateTime<Utc>,
}

/// A discovery strategy for one on-disk layout
pub trait LayoutStrategy: Send + Sync {
    fn layout(&self) -> SnapshotLayout;

    /// Human-readable path shape, used in "not found" diagnostics
    fn expected_shape(&self) -> &'static str;

    /// Every well-formed snapshot file under `root`, sorted by path
    fn discover(&self, root: &Path) -> Vec<SnapshotFileInfo>;
}

/// `root/{preview|registered}/<stack>[-<eventId>].json`
pub struct ModePartitionedLayout;

impl LayoutStrategy for ModePartitionedLayout {
    fn layout(&self) -> SnapshotLayout {
        SnapshotLayout::ModePartitioned
    }

    fn expected_shape(&self) -> &'static str {
        "<root>/preview/<stack>.json or <root>/registered/<stack>-<uuid>.json"
    }

    fn discover(&self, root: &Path) -> Vec<SnapshotFileInfo> {
        let mut files = Vec::new();

        for (dir, mode) in [
            (PREVIEW_DIR, SnapshotMode::Preview),
            (REGISTERED_DIR, SnapshotMode::Registered),
        ] {
            for entry in json_files(&root.join(dir), 1) {
                let file_name = entry.file_name().to_string_lossy();
                let parsed = match mode {
                    SnapshotMode::Registered => filename::parse_registered(&file_name)
                        .map(|(stack, event)| (stack, Some(event))),
                    _ => filename::parse_preview(&file_name).map(|stack| (stack, None)),
                };

                let Some((stack, event_id)) = parsed else {
                    debug!("Skipping {} snapshot with unrecognized name: {}", mode, entry.path().display());
                    continue;
                };

                files.push(SnapshotFileInfo {
                    path: entry.path().to_path_buf(),
                    mode,
                    stack,
                    provider: None,
                    account: None,
                    region: None,
                    datastore_type: None,
                    resource_id: None,
                    event_id,
                    modified: modified_at(&entry),
                });
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

/// `root/<provider>/<account>/<region>/<stack>/<datastoreType>/<resourceId>.json`
pub struct CacheLayout;

impl LayoutStrategy for CacheLayout {
    fn layout(&self) -> SnapshotLayout {
        SnapshotLayout::Cache
    }

    fn expected_shape(&self) -> &'static str {
        "<root>/<provider>/<account>/<region>/<stack>/<datastoreType>/<resourceId>.json"
    }

    fn discover(&self, root: &Path) -> Vec<SnapshotFileInfo> {
        let mut files = Vec::new();

        for entry in json_files(root, CACHE_DEPTH) {
            let file_name = entry.file_name().to_string_lossy();
            let Some(resource_id) = filename::parse_cache_leaf(&file_name) else {
                debug!("Skipping cache entry with unrecognized name: {}", entry.path().display());
                continue;
            };

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let [provider, account, region, stack, datastore_type, _leaf] = segments.as_slice() else {
                continue;
            };

            files.push(SnapshotFileInfo {
                path: entry.path().to_path_buf(),
                mode: SnapshotMode::Cached,
                stack: stack.clone(),
                provider: Some(provider.clone()),
                account: Some(account.clone()),
                region: Some(region.clone()),
                datastore_type: Some(datastore_type.clone()),
                resource_id: Some(resource_id),
                event_id: None,
                modified: modified_at(&entry),
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

/// Regular `.json` files exactly `depth` levels below `dir`.
/// A missing directory yields nothing.
fn json_files(dir: &Path, depth: usize) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(dir)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false)
        })
}

fn modified_at(entry: &DirEntry) -> DateTime<Utc> {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|| DateTime::<Utc>::from(UNIX_EPOCH))
}

/// Store for discovering snapshot files under one root
pub struct SnapshotStore {
    root: PathBuf,
    strategy: Box<dyn LayoutStrategy>,
}

impl SnapshotStore {
    /// Open a root, selecting the layout by the presence of mode directories
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let strategy: Box<dyn LayoutStrategy> = match Self::detect_layout(&root) {
            SnapshotLayout::ModePartitioned => Box::new(ModePartitionedLayout),
            SnapshotLayout::Cache => Box::new(CacheLayout),
        };

        debug!("Snapshot root {} uses the {} layout", root.display(), strategy.layout());
        Self { root, strategy }
    }

    pub fn detect_layout(root: &Path) -> SnapshotLayout {
        if root.join(PREVIEW_DIR).is_dir() || root.join(REGISTERED_DIR).is_dir() {
            SnapshotLayout::ModePartitioned
        } else {
            SnapshotLayout::Cache
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> SnapshotLayout {
        self.strategy.layout()
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Path shape of the detected layout, or of both when the root is missing
    pub fn expected_shape(&self) -> String {
        if self.exists() {
            self.strategy.expected_shape().to_string()
        } else {
            format!(
                "{} or {}",
                ModePartitionedLayout.expected_shape(),
                CacheLayout.expected_shape()
            )
        }
    }

    /// List every well-formed snapshot file (empty when the root is missing)
    pub fn list(&self) -> Vec<SnapshotFileInfo> {
        if !self.exists() {
            debug!("Snapshot root {} does not exist", self.root.display());
            return Vec::new();
        }

        let files = self.strategy.discover(&self.root);
        debug!("Discovered {} snapshot file(s) under {}", files.len(), self.root.display());
        files
    }

    /// Read the raw content of a discovered file
    pub fn read(&self, info: &SnapshotFileInfo) -> Result<Vec<u8>, AppError> {
        Ok(std::fs::read(&info.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_file;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const EVENT: &str = "3f2b8c1e-9d4a-4b7e-8f00-1a2b3c4d5e6f";

    #[test]
    fn test_missing_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open(dir.path().join("does-not-exist"));
        assert!(store.list().is_empty());
        assert!(!store.exists());

        let shape = store.expected_shape();
        assert!(shape.contains("<root>/registered/<stack>-<uuid>.json"));
        assert!(shape.contains("<root>/<provider>/<account>/<region>"));
    }

    #[test]
    fn test_mode_partitioned_discovery() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "preview/Backend.json", "{}");
        write_file(dir.path(), &format!("registered/Backend-{EVENT}.json"), "{}");
        write_file(dir.path(), "registered/Backend-not-a-uuid.json", "{}");
        write_file(dir.path(), "preview/notes.txt", "");
        std::fs::create_dir_all(dir.path().join("preview/nested.json")).unwrap();

        let store = SnapshotStore::open(dir.path());
        assert_eq!(store.layout(), SnapshotLayout::ModePartitioned);

        let files = store.list();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].mode, SnapshotMode::Preview);
        assert_eq!(files[0].stack, "Backend");
        assert_eq!(files[0].event_id, None);
        assert_eq!(files[1].mode, SnapshotMode::Registered);
        assert_eq!(files[1].stack, "Backend");
        assert_eq!(files[1].event_id.map(|e| e.to_string()).as_deref(), Some(EVENT));
    }

    #[test]
    fn test_cache_layout_discovery() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "aws/123456789012/us-east-1/Backend/dynamodb/UsersTable.json",
            "{}",
        );
        write_file(dir.path(), "aws/123456789012/us-east-1/Backend/UsersTable.json", "{}");
        write_file(
            dir.path(),
            "aws/123456789012/us-east-1/Backend/dynamodb/README.md",
            "",
        );

        let store = SnapshotStore::open(dir.path());
        assert_eq!(store.layout(), SnapshotLayout::Cache);

        let files = store.list();
        assert_eq!(files.len(), 1);
        let file = &files[0];
        assert_eq!(file.mode, SnapshotMode::Cached);
        assert_eq!(file.provider.as_deref(), Some("aws"));
        assert_eq!(file.account.as_deref(), Some("123456789012"));
        assert_eq!(file.region.as_deref(), Some("us-east-1"));
        assert_eq!(file.stack, "Backend");
        assert_eq!(file.datastore_type.as_deref(), Some("dynamodb"));
        assert_eq!(file.resource_id.as_deref(), Some("UsersTable"));
    }

    #[test]
    fn test_discovery_order_is_by_path() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "aws/1/us-east-1/Zeta/dynamodb/B.json", "{}");
        write_file(dir.path(), "aws/1/us-east-1/Alpha/dynamodb/A.json", "{}");

        let files = SnapshotStore::open(dir.path()).list();
        let stacks: Vec<_> = files.iter().map(|f| f.stack.as_str()).collect();
        assert_eq!(stacks, vec!["Alpha", "Zeta"]);
    }
}
