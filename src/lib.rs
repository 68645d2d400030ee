//! Helmsman - Cluster Task Orchestrator Adapter
//!
//! Control-plane component mediating between an external cluster-management
//! supervisor and an internal search/index service:
//! - Versioned task list with long-poll ("wait until revision changes") semantics
//! - Admission state machine with exclusion rules between task kinds
//! - Non-blocking progress aggregation from collaborator telemetry
//! - Long-pollable cluster topology snapshot

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export key types for convenience
pub use domain::errors::{OrchestratorError, OrchestratorResult};
pub use services::admission::Orchestrator;
