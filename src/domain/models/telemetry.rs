//! Progress telemetry emitted by external collaborators.

use std::collections::HashMap;

/// A feed position: source uuid plus sequence number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UuidSeq {
    pub uuid: String,
    pub seq: u64,
}

impl UuidSeq {
    pub fn new(uuid: impl Into<String>, seq: u64) -> Self {
        Self { uuid: uuid.into(), seq }
    }
}

/// Transfer state for one partition replica on one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionEntry {
    pub pindex: String,
    pub node: String,
    /// Feed position when the movement started.
    pub init_uuid_seq: UuidSeq,
    /// Feed position right now.
    pub curr_uuid_seq: UuidSeq,
    /// Feed position the movement must reach.
    pub want_uuid_seq: UuidSeq,
    /// Byte-level transfer progress in [0, 1]; 0 when not file-based.
    pub transfer_progress: f64,
}

/// Nested rebalance telemetry: pindex -> source partition -> node -> entry.
pub type RebalanceTelemetry = HashMap<String, HashMap<String, HashMap<String, PartitionEntry>>>;

/// Flat hibernation telemetry: node -> progress in [0, 1].
pub type HibernationTelemetry = HashMap<String, f64>;

/// Aggregated per-task progress, published to the registry consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgressUpdate {
    pub task_id: String,
    /// Upstream error messages; non-empty flips the task to failed.
    pub errors: Vec<String>,
    /// False when the batch carried no computable progress figure.
    pub progress_exists: bool,
    pub progress: f64,
}
