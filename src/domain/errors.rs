//! Domain errors for the helmsman orchestrator.

use thiserror::Error;

/// Tagged errors surfaced across the supervisor RPC boundary.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The caller's cancel signal fired while waiting.
    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid revision: {0}")]
    BadRevision(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency mismatch, or an exclusion rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    /// Wrapped failure from the rebalancer or the hibernation manager.
    /// The message carries the upstream text.
    #[error("adapter error: {0}")]
    Adapter(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
