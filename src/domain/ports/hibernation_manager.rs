//! Port to the bucket hibernation engine.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::hibernation::HibernationKind;
use crate::domain::models::telemetry::HibernationTelemetry;

/// Observer handed to the hibernation manager at admission.
///
/// Same discipline as the rebalance observer: never block, never touch the
/// registry directly.
pub trait HibernationObserver: Send {
    fn on_progress(&mut self, telemetry: &HibernationTelemetry, errors: &[String]);
}

#[async_trait]
pub trait HibernationManager: Send + Sync {
    /// Pre-flight work for a pause/resume: credential and capacity checks
    /// against the blob storage region.
    async fn prepare_util(
        &self,
        kind: HibernationKind,
        bucket: &str,
        region: &str,
        rate_limit: u64,
        dry_run: bool,
    ) -> OrchestratorResult<()>;

    /// Start moving the bucket; progress arrives on `observer`.
    async fn start_hibernation(
        &self,
        dry_run: bool,
        bucket: &str,
        remote_path: &str,
        kind: HibernationKind,
        observer: Box<dyn HibernationObserver>,
    ) -> OrchestratorResult<()>;

    /// Stop the in-flight hibernation task. Non-blocking and idempotent.
    fn stop_hibernation_task(&self);

    /// Forget which bucket is being tracked for hibernation.
    fn reset_bucket_tracked(&self);
}
