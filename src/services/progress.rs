//! Progress aggregation pipeline.
//!
//! Collaborator observers convert raw telemetry into a per-task progress
//! figure and publish it onto a bounded channel; a single consumer task
//! applies updates to the registry. Observers never block: a full channel
//! drops the update, and a later batch re-derives the same figures.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::models::task::TaskStatus;
use crate::domain::models::telemetry::{
    HibernationTelemetry, PartitionEntry, RebalanceTelemetry, TaskProgressUpdate,
};
use crate::domain::ports::hibernation_manager::HibernationObserver;
use crate::domain::ports::rebalancer::{RebalanceObserver, Rebalancer};
use super::registry::TaskRegistry;

/// Hard capacity of the telemetry channel. Overflow drops the newest
/// update; progress is idempotent and re-derivable from later batches, and
/// terminal error batches repeat.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 10;

/// Weight of byte-transfer progress relative to sequence catch-up.
const TRANSFER_WEIGHT: f64 = 0.8;
const SEQ_WEIGHT: f64 = 0.2;

/// The bounded channel connecting observers to the registry consumer.
pub fn progress_channel() -> (
    mpsc::Sender<TaskProgressUpdate>,
    mpsc::Receiver<TaskProgressUpdate>,
) {
    mpsc::channel(PROGRESS_CHANNEL_CAPACITY)
}

/// Publish without blocking. Observers run on collaborator threads and
/// must never wait on the registry.
fn publish(tx: &mpsc::Sender<TaskProgressUpdate>, update: TaskProgressUpdate) {
    match tx.try_send(update) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(update)) => {
            debug!(task_id = %update.task_id, "progress channel full, dropping update");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

/// Sequence-based progress for one entry, when computable.
fn seq_progress(entry: &PartitionEntry) -> Option<f64> {
    if entry.want_uuid_seq.seq <= entry.curr_uuid_seq.seq {
        return Some(1.0);
    }
    let span = entry.want_uuid_seq.seq.saturating_sub(entry.init_uuid_seq.seq);
    if span == 0 {
        return None;
    }
    let caught_up = entry.curr_uuid_seq.seq.saturating_sub(entry.init_uuid_seq.seq);
    #[allow(clippy::cast_precision_loss)]
    let pct = caught_up as f64 / span as f64;
    Some(pct)
}

/// Reported progress for one entry: byte transfer dominates when present,
/// with sequence catch-up contributing the remainder.
fn entry_progress(entry: &PartitionEntry) -> Option<f64> {
    if entry.want_uuid_seq.uuid.is_empty() {
        return None;
    }
    let seq_pct = seq_progress(entry);
    if entry.transfer_progress > 0.0 {
        let blended = match seq_pct {
            Some(pct) if pct > 0.0 => {
                TRANSFER_WEIGHT * entry.transfer_progress + SEQ_WEIGHT * pct
            }
            _ => TRANSFER_WEIGHT * entry.transfer_progress,
        };
        return Some(blended);
    }
    seq_pct
}

/// Converts nested rebalance telemetry into a single task progress figure.
///
/// Owned by the rebalancer's callback thread. The per-(pindex, node) cache
/// only ever grows toward 1.0, so dropped batches never regress the final
/// figure.
pub struct RebalanceProgress {
    task_id: String,
    rebalancer: Arc<dyn Rebalancer>,
    pindex_node_progress: HashMap<String, HashMap<String, f64>>,
    tx: mpsc::Sender<TaskProgressUpdate>,
}

impl RebalanceProgress {
    pub fn new(
        task_id: impl Into<String>,
        rebalancer: Arc<dyn Rebalancer>,
        tx: mpsc::Sender<TaskProgressUpdate>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            rebalancer,
            pindex_node_progress: HashMap::new(),
            tx,
        }
    }

    fn update_cache(&mut self, telemetry: &RebalanceTelemetry) {
        for (pindex, partitions) in telemetry {
            let cache = self.pindex_node_progress.entry(pindex.clone()).or_default();

            // One node can appear under several source partitions; its
            // percentage averages the per-entry values across them.
            let mut node_entries: HashMap<&String, Vec<&PartitionEntry>> = HashMap::new();
            for entries in partitions.values() {
                for (node, entry) in entries {
                    node_entries.entry(node).or_default().push(entry);
                }
            }

            for (node, entries) in node_entries {
                // A finished movement stays finished.
                if cache.get(node).copied().unwrap_or(0.0) >= 1.0 {
                    continue;
                }
                let values: Vec<f64> = entries.iter().copied().filter_map(entry_progress).collect();
                if values.is_empty() {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let pct = values.iter().sum::<f64>() / values.len() as f64;
                let cached = cache.entry(node.clone()).or_insert(0.0);
                if pct > *cached {
                    *cached = pct;
                }
            }
        }
    }

    /// Roll the cache up into one figure: the sum of positive entries over
    /// `max(count, moving partitions hint)`.
    fn task_progress(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for nodes in self.pindex_node_progress.values() {
            for &value in nodes.values() {
                if value > 0.0 {
                    sum += value;
                    count += 1;
                }
            }
        }
        let denom = count.max(self.rebalancer.moving_partitions_count());
        if denom > 0 {
            #[allow(clippy::cast_precision_loss)]
            return sum / denom as f64;
        }
        0.0
    }
}

impl RebalanceObserver for RebalanceProgress {
    fn on_progress(
        &mut self,
        telemetry: Option<&RebalanceTelemetry>,
        errors: &[String],
    ) -> String {
        let Some(telemetry) = telemetry else {
            // Completion: nothing left to compute. The registry consumer
            // applies the final errors, if any.
            publish(
                &self.tx,
                TaskProgressUpdate {
                    task_id: self.task_id.clone(),
                    errors: errors.to_vec(),
                    progress_exists: false,
                    progress: 0.0,
                },
            );
            return "DONE".to_string();
        };

        self.update_cache(telemetry);
        let progress = self.task_progress();
        publish(
            &self.tx,
            TaskProgressUpdate {
                task_id: self.task_id.clone(),
                errors: errors.to_vec(),
                progress_exists: true,
                progress,
            },
        );
        format!("progress: {progress:.3}")
    }
}

/// Converts flat hibernation telemetry into a per-task mean.
pub struct HibernationProgress {
    task_id: String,
    tx: mpsc::Sender<TaskProgressUpdate>,
}

impl HibernationProgress {
    pub fn new(task_id: impl Into<String>, tx: mpsc::Sender<TaskProgressUpdate>) -> Self {
        Self {
            task_id: task_id.into(),
            tx,
        }
    }
}

impl HibernationObserver for HibernationProgress {
    fn on_progress(&mut self, telemetry: &HibernationTelemetry, errors: &[String]) {
        let (progress_exists, progress) = if telemetry.is_empty() {
            (false, 0.0)
        } else {
            #[allow(clippy::cast_precision_loss)]
            let mean = telemetry.values().sum::<f64>() / telemetry.len() as f64;
            (true, mean)
        };
        publish(
            &self.tx,
            TaskProgressUpdate {
                task_id: self.task_id.clone(),
                errors: errors.to_vec(),
                progress_exists,
                progress,
            },
        );
    }
}

/// Drain the progress channel, applying one registry mutation per update.
/// Runs until every sender is gone.
pub async fn run_progress_consumer(
    registry: Arc<TaskRegistry>,
    mut rx: mpsc::Receiver<TaskProgressUpdate>,
) {
    while let Some(update) = rx.recv().await {
        apply_update(&registry, update).await;
    }
    debug!("progress consumer stopped");
}

async fn apply_update(registry: &TaskRegistry, update: TaskProgressUpdate) {
    if !update.progress_exists && update.errors.is_empty() {
        return;
    }
    let mut state = registry.lock().await;
    let Some(pos) = state.find(&update.task_id) else {
        // Cancelled or never admitted; late telemetry drops silently.
        debug!(task_id = %update.task_id, "progress for unknown task, dropping");
        return;
    };
    let rev = state.next_task_rev();
    let handle = &mut state.handles_mut()[pos];
    let mut task = handle.task.clone();
    task.rev = rev;
    task.progress = update.progress;
    task.error_message = update.errors.join("\n");
    if !update.errors.is_empty() {
        task.status = TaskStatus::Failed;
        warn!(
            task_id = %task.id,
            error_count = update.errors.len(),
            "task failed upstream"
        );
    }
    handle.task = task;
    registry.commit(&mut state);
}
