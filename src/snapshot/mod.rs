//! Snapshot Module
//!
//! Everything between the snapshot directory and a clean list of entities:
//! - Discovery across the two on-disk layouts
//! - Strict filename parsing
//! - Payload normalization (legacy keys, inherited context)
//! - Authoritative selection (registered over preview, newest first)

pub mod filename;
pub mod model;
pub mod resolver;
pub mod store;

pub use model::{KeyAttribute, KeySchema, ResolvedSnapshot, SecondaryIndex};
pub use resolver::{ModeFilter, NotFoundReport, SnapshotQuery, SnapshotResolver};
pub use store::SnapshotStore;
