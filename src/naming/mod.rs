//! Field Naming Module
//!
//! Resolves schema field names to target-language identifiers and reports
//! names that collide after the transform.

pub mod collision;
pub mod language;

pub use collision::{detect_collisions, Collision};
pub use language::{FieldNameResolver, TargetLanguage};
