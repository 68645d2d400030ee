//! Port to the partition-movement engine.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::revision::Rev;
use crate::domain::models::telemetry::RebalanceTelemetry;

/// Observer handed to the rebalancer at admission.
///
/// Driven from the rebalancer's own worker. Implementations must never
/// block and must not call back into the task registry; progress flows
/// through a bounded channel instead. The returned string is used only in
/// the rebalancer's logs.
pub trait RebalanceObserver: Send {
    /// Report one telemetry batch. `telemetry == None` signals completion
    /// of the run; `errors` carries upstream failures, if any.
    fn on_progress(
        &mut self,
        telemetry: Option<&RebalanceTelemetry>,
        errors: &[String],
    ) -> String;
}

/// Outcome of the most recent rebalance run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceStatus {
    NotStarted,
    Started,
    Finished,
}

/// Internal change handed to the rebalancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTopologySpec {
    /// `"rebalance"` or `"failover-hard"`.
    pub mode: String,
    /// Uuids of nodes that remain members.
    pub member_node_uuids: Vec<String>,
    /// Uuids of nodes being ejected.
    pub eject_node_uuids: Vec<String>,
}

#[async_trait]
pub trait Rebalancer: Send + Sync {
    /// Begin a topology change. Returns the revision token that identifies
    /// the run for [`stop_change_topology`](Self::stop_change_topology).
    async fn change_topology(
        &self,
        spec: ChangeTopologySpec,
        observer: Box<dyn RebalanceObserver>,
    ) -> OrchestratorResult<Rev>;

    /// Stop the change identified by `rev`. Non-blocking and idempotent.
    fn stop_change_topology(&self, rev: &Rev);

    fn last_rebalance_status(&self) -> OrchestratorResult<RebalanceStatus>;

    /// Planned number of partition movements for the current run. Set once
    /// per run, before the first progress callback; used as the aggregation
    /// denominator when per-partition counting under-reports.
    fn moving_partitions_count(&self) -> usize;
}
