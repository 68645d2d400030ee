//! Port to the authoritative topology source.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::revision::Rev;
use crate::domain::models::topology::SourceTopology;

#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn get_topology(&self) -> OrchestratorResult<SourceTopology>;

    /// Resolve once the source's topology rev differs from `have_rev`.
    /// Callers race this against their own cancel and timeout signals.
    async fn wait_topology(&self, have_rev: &Rev) -> OrchestratorResult<SourceTopology>;

    /// Re-register the local node if the source has lost its definition.
    async fn check_and_reregister_self(&self, node_uuid: &str);

    /// Notification that a prepare entry point succeeded. Not retryable.
    fn on_successful_prepare(&self, is_topology: bool);

    fn set_task_orchestrator(&self, enabled: bool);

    fn is_task_orchestrator(&self) -> bool;
}
