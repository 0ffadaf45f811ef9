//! Generation Pipeline Module
//!
//! Connects resolved snapshots to the external code generator:
//!
//! 1. **Schema**: validate each live entity's raw schema
//! 2. **Generator**: the emitter contract and per-table metadata
//! 3. **Orchestrator**: group, check, name and generate, one table at a time
//! 4. **Report**: per-entity outcome list and console summary

pub mod generator;
pub mod orchestrator;
pub mod report;
pub mod schema;

// Re-export main types for convenient access
pub use orchestrator::{GenerationRequest, Orchestrator};
