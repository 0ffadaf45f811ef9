//! Table Grouper
//!
//! Several entities can live in one physical table (single-table design).
//! Grouping partitions resolved snapshots by the table they are bound to.

use crate::config::RegionConfig;
use crate::snapshot::ResolvedSnapshot;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Markers left behind by infrastructure synthesis for values it could not
/// resolve yet
const PLACEHOLDER_MARKERS: &[&str] = &["${Token[", "${", "Token[", "#{"];

/// Whether a value still contains unresolved synthesis tokens
pub fn is_unresolved(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }
    if PLACEHOLDER_MARKERS.iter().any(|marker| value.contains(marker)) {
        return true;
    }
    // arn:partition:service:region:account:resource
    if value.starts_with("arn:") {
        let segments: Vec<&str> = value.splitn(6, ':').collect();
        return segments.len() < 6
            || segments[3..5]
                .iter()
                .any(|s| s.eq_ignore_ascii_case(crate::config::UNKNOWN_SENTINEL));
    }
    false
}

/// Key identifying one physical table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TableIdentity {
    /// Provider-assigned resource identifier
    ResourceId(String),
    Arn(String),
    /// `account:region:resourceName`
    Composite(String),
}

impl TableIdentity {
    /// Derive the identity of the table a snapshot is bound to.
    ///
    /// Identifiers that still carry placeholder tokens are never trusted:
    /// they would split one table into several groups.
    pub fn derive(snapshot: &ResolvedSnapshot, regions: &RegionConfig) -> Self {
        let resource = &snapshot.resource;

        if let Some(id) = resource.resource_id.as_deref().filter(|id| !is_unresolved(id)) {
            return TableIdentity::ResourceId(id.trim().to_string());
        }
        if let Some(arn) = resource.arn.as_deref().filter(|arn| !is_unresolved(arn)) {
            return TableIdentity::Arn(arn.trim().to_string());
        }

        TableIdentity::Composite(format!(
            "{}:{}:{}",
            snapshot.context.account,
            snapshot.effective_region(regions),
            snapshot.resource_name
        ))
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableIdentity::ResourceId(value)
            | TableIdentity::Arn(value)
            | TableIdentity::Composite(value) => write!(f, "{}", value),
        }
    }
}

/// All entities bound to one physical table, in discovery order
#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup {
    pub identity: TableIdentity,
    pub members: Vec<ResolvedSnapshot>,
}

impl TableGroup {
    /// Members that still have a schema
    pub fn live_members(&self) -> impl Iterator<Item = &ResolvedSnapshot> {
        self.members.iter().filter(|m| !m.is_delete())
    }

    /// Member whose resource block describes the table
    pub fn metadata_source(&self) -> Option<&ResolvedSnapshot> {
        self.live_members().next().or_else(|| self.members.first())
    }

    pub fn table_name(&self) -> &str {
        self.metadata_source()
            .map(|m| m.resource.name.as_str())
            .unwrap_or_default()
    }
}

/// Partition snapshots into table groups.
///
/// Every snapshot lands in exactly one group. Groups are ordered by first
/// appearance and members keep their input order.
pub fn group(snapshots: Vec<ResolvedSnapshot>, regions: &RegionConfig) -> Vec<TableGroup> {
    let mut groups: Vec<TableGroup> = Vec::new();
    let mut index: HashMap<TableIdentity, usize> = HashMap::new();

    for snapshot in snapshots {
        let identity = TableIdentity::derive(&snapshot, regions);
        match index.get(&identity) {
            Some(&position) => groups[position].members.push(snapshot),
            None => {
                index.insert(identity.clone(), groups.len());
                groups.push(TableGroup {
                    identity,
                    members: vec![snapshot],
                });
            }
        }
    }

    tracing::debug!("Grouped entities into {} table(s)", groups.len());
    groups
}
