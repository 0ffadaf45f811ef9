//! Collision Detector
//!
//! Two raw fields that resolve to the same identifier would produce
//! uncompilable (or silently wrong) generated code.

use crate::naming::language::FieldNameMapping;
use serde::Serialize;
use std::collections::HashMap;

/// Raw field names that resolve to one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub identifier: String,
    pub raw_names: Vec<String>,
    pub explanation: String,
}

/// Group mappings by identifier; any identifier with more than one source
/// is a collision. Output follows first appearance of each identifier.
pub fn detect_collisions(mappings: &[FieldNameMapping]) -> Vec<Collision> {
    let mut buckets: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(mappings.len());

    for mapping in mappings {
        let identifier = mapping.identifier.as_str();
        match index.get(identifier) {
            Some(&position) => buckets[position].1.push(mapping.raw.as_str()),
            None => {
                index.insert(identifier, buckets.len());
                buckets.push((identifier, vec![mapping.raw.as_str()]));
            }
        }
    }

    buckets
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(identifier, sources)| {
            let explanation = if sources.iter().all(|s| *s == sources[0]) {
                format!("field '{}' is declared {} times", sources[0], sources.len())
            } else {
                let quoted = sources
                    .iter()
                    .map(|s| format!("'{}'", s))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("fields {} all resolve to '{}'", quoted, identifier)
            };

            Collision {
                identifier: identifier.to_string(),
                raw_names: sources.into_iter().map(str::to_string).collect(),
                explanation,
            }
        })
        .collect()
}
