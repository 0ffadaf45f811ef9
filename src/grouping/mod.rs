//! Table Grouping Module
//!
//! Partitions entities by physical table and checks that every table has a
//! single, agreed key schema.

pub mod grouper;
pub mod keys;

pub use grouper::{group, is_unresolved, TableGroup};
pub use keys::{validate, KeyMismatch};
