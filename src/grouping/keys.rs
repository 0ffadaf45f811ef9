//! Key Consistency Validator
//!
//! A physical table has exactly one key schema, so every live entity bound
//! to it must declare the same partition and sort key field names.

use crate::grouping::grouper::TableGroup;
use crate::snapshot::KeySchema;
use serde::Serialize;
use std::fmt;

/// Two entities on one table disagree on key fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMismatch {
    pub table: String,
    pub baseline_entity: String,
    pub expected: KeySchema,
    pub entity: String,
    pub found: KeySchema,
}

impl fmt::Display for KeyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Key schema mismatch on table {}: '{}' declares {} but '{}' declares {}",
            self.table, self.baseline_entity, self.expected, self.entity, self.found
        )
    }
}

/// Check that all non-deleted members agree with the first one
pub fn validate(group: &TableGroup) -> Result<(), KeyMismatch> {
    let mut live = group.live_members();
    let Some(baseline) = live.next() else {
        return Ok(());
    };

    for member in live {
        if member.key_schema != baseline.key_schema {
            return Err(KeyMismatch {
                table: group.identity.to_string(),
                baseline_entity: baseline.entity_name.clone(),
                expected: baseline.key_schema.clone(),
                entity: member.entity_name.clone(),
                found: member.key_schema.clone(),
            });
        }
    }

    Ok(())
}
