//! Registration slots for externally supplied hooks.
//!
//! Each slot is settable exactly once during initialization and read-only
//! afterwards, so reads need no synchronization beyond the `OnceLock`.

use std::sync::OnceLock;

use serde_json::Value;

use crate::domain::errors::OrchestratorResult;

/// Computes the projected post-balance resource usage.
pub type DefragUtilizationHook = Box<dyn Fn() -> OrchestratorResult<Value> + Send + Sync>;

/// Validates a hibernation remote path ahead of a dry-run resume.
pub type RemotePathValidator = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Hook slots owned by the orchestrator.
#[derive(Default)]
pub struct Hooks {
    defrag_utilization: OnceLock<DefragUtilizationHook>,
    remote_path_valid: OnceLock<RemotePathValidator>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the defragmented-utilization hook. Returns false when a
    /// hook was already registered; the existing hook is kept.
    pub fn set_defrag_utilization(&self, hook: DefragUtilizationHook) -> bool {
        self.defrag_utilization.set(hook).is_ok()
    }

    pub fn defrag_utilization(&self) -> Option<&DefragUtilizationHook> {
        self.defrag_utilization.get()
    }

    /// Register the remote-path validator. Returns false when a validator
    /// was already registered; the existing validator is kept.
    pub fn set_remote_path_validator(&self, validator: RemotePathValidator) -> bool {
        self.remote_path_valid.set(validator).is_ok()
    }

    /// Validate `path`, or `None` when no validator is registered.
    pub fn remote_path_valid(&self, path: &str) -> Option<bool> {
        self.remote_path_valid.get().map(|validator| validator(path))
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("defrag_utilization", &self.defrag_utilization.get().is_some())
            .field("remote_path_valid", &self.remote_path_valid.get().is_some())
            .finish()
    }
}
