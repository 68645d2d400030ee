//! Admission state machine and the supervisor-facing RPC surface.
//!
//! Every entry point validates the exclusion rules against the live handle
//! set while holding the registry lock, calls the external collaborator,
//! and only then inserts (or replaces) a handle. Holding the lock across
//! the collaborator call serializes admission against telemetry
//! application; collaborators deliver progress through the bounded channel
//! instead of calling back in.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::config::NodeConfig;
use crate::domain::models::hibernation::{HibernationKind, PauseParams, ResumeParams};
use crate::domain::models::revision::Rev;
use crate::domain::models::task::{
    OrchestratorTask, TaskExtras, TaskKind, TaskList, TaskPhase, TaskStatus,
};
use crate::domain::models::telemetry::TaskProgressUpdate;
use crate::domain::models::topology::{NodeInfo, Topology, TopologyChange};
use crate::domain::ports::hibernation_manager::HibernationManager;
use crate::domain::ports::hooks::Hooks;
use crate::domain::ports::rebalancer::{ChangeTopologySpec, Rebalancer};
use crate::domain::ports::topology_source::TopologySource;
use super::progress::{
    progress_channel, run_progress_consumer, HibernationProgress, RebalanceProgress,
};
use super::registry::{RegistryState, Stop, TaskHandle, TaskRegistry};
use super::topology_view::TopologyView;

/// Message attached to resume handles whose dry-run path validation failed.
const INVALID_REMOTE_PATH: &str = "invalid remote path";

/// The cluster task orchestrator: task admission, the long-pollable task
/// list, and the topology view, in front of the collaborator ports.
pub struct Orchestrator {
    node: NodeConfig,
    registry: Arc<TaskRegistry>,
    rebalancer: Arc<dyn Rebalancer>,
    hibernation: Arc<dyn HibernationManager>,
    topology: Arc<dyn TopologySource>,
    topology_view: TopologyView,
    hooks: Arc<Hooks>,
    progress_tx: mpsc::Sender<TaskProgressUpdate>,
}

impl Orchestrator {
    /// Build the orchestrator and spawn its progress consumer.
    pub fn new(
        node: NodeConfig,
        wait_timeout: Duration,
        rebalancer: Arc<dyn Rebalancer>,
        hibernation: Arc<dyn HibernationManager>,
        topology: Arc<dyn TopologySource>,
        hooks: Arc<Hooks>,
    ) -> Arc<Self> {
        let registry = Arc::new(TaskRegistry::new(wait_timeout));
        let (progress_tx, progress_rx) = progress_channel();
        tokio::spawn(run_progress_consumer(registry.clone(), progress_rx));

        let topology_view =
            TopologyView::new(topology.clone(), rebalancer.clone(), wait_timeout);

        Arc::new(Self {
            node,
            registry,
            rebalancer,
            hibernation,
            topology,
            topology_view,
            hooks,
            progress_tx,
        })
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Query surface
    // ------------------------------------------------------------------

    pub fn node_info(&self) -> NodeInfo {
        NodeInfo {
            node_uuid: self.node.uuid.clone(),
            hostname: self.node.hostname.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Long-pollable task list.
    pub async fn task_list(
        &self,
        have_rev: Option<&Rev>,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> OrchestratorResult<TaskList> {
        self.registry.list(have_rev, cancel).await
    }

    /// Long-pollable supervisor-facing topology.
    pub async fn current_topology(
        &self,
        have_rev: Option<&Rev>,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> OrchestratorResult<Topology> {
        self.topology_view.current(have_rev, cancel).await
    }

    /// Projected post-balance utilization from the registered hook, or
    /// `None` when no hook is registered.
    pub fn defragmented_utilization(&self) -> OrchestratorResult<Option<serde_json::Value>> {
        match self.hooks.defrag_utilization() {
            Some(hook) => hook().map(Some),
            None => Ok(None),
        }
    }

    pub fn is_task_orchestrator(&self) -> bool {
        self.topology.is_task_orchestrator()
    }

    /// Hibernation surface state: whether a pause/resume is still in its
    /// prepared plan phase, and which direction is in flight.
    pub async fn hibernation_status(&self) -> (bool, String) {
        let state = self.registry.lock().await;
        for handle in state.handles() {
            match (handle.task.kind, &handle.task.extra) {
                (TaskKind::BucketPause, _) => return (false, "pause".to_string()),
                (TaskKind::BucketResume, _) => return (false, "resume".to_string()),
                (TaskKind::Prepared, TaskExtras::PausePrepare(_)) => {
                    return (true, "pause".to_string())
                }
                (TaskKind::Prepared, TaskExtras::ResumePrepare(_)) => {
                    return (true, "resume".to_string())
                }
                _ => {}
            }
        }
        (false, String::new())
    }

    // ------------------------------------------------------------------
    // Task admission
    // ------------------------------------------------------------------

    /// Reserve a topology change: inserts a prepared placeholder that
    /// excludes competing prepares and rebalances.
    pub async fn prepare_topology_change(
        &self,
        change: TopologyChange,
    ) -> OrchestratorResult<()> {
        let mut state = self.registry.lock().await;
        reject_conflicts(&state, &[TaskKind::Prepared, TaskKind::Rebalance])?;
        self.check_topology_rev(change.current_topology_rev.as_ref())
            .await?;

        let change_id = change.id.clone();
        let rev = state.next_task_rev();
        let task = OrchestratorTask {
            id: TaskPhase::Prepare.task_id(&change.id),
            rev,
            kind: TaskKind::Prepared,
            status: TaskStatus::Running,
            cancelable: true,
            progress: 1.0,
            detailed_progress: BTreeMap::new(),
            description: "prepare topology change".to_string(),
            error_message: String::new(),
            extra: TaskExtras::TopologyChange(change),
        };
        state.handles_mut().push(TaskHandle::new(task, Stop::None));
        self.registry.commit(&mut state);
        drop(state);

        self.topology.on_successful_prepare(true);
        info!(change_id = %change_id, "topology change prepared");
        Ok(())
    }

    /// Promote the prepared topology change into a running rebalance.
    pub async fn start_topology_change(&self, change: TopologyChange) -> OrchestratorResult<()> {
        let mut state = self.registry.lock().await;
        reject_conflicts(&state, &[TaskKind::Rebalance])?;
        let Some(pos) = state
            .handles()
            .iter()
            .position(|handle| handle.task.kind == TaskKind::Prepared)
        else {
            return Err(OrchestratorError::NotFound(
                "no prepared topology change".to_string(),
            ));
        };
        self.check_topology_rev(change.current_topology_rev.as_ref())
            .await?;
        let Some(mode) = change.change_type.rebalance_mode() else {
            return Err(OrchestratorError::NotSupported(format!(
                "topology change type {:?}",
                change.change_type
            )));
        };

        // A keep list naming the local node implies we must still be
        // registered with the topology source.
        if change.keep_nodes.iter().any(|uuid| *uuid == self.node.uuid) {
            self.topology.check_and_reregister_self(&self.node.uuid).await;
        }

        let task_id = TaskPhase::Rebalance.task_id(&change.id);
        let observer = Box::new(RebalanceProgress::new(
            task_id.clone(),
            self.rebalancer.clone(),
            self.progress_tx.clone(),
        ));
        let spec = ChangeTopologySpec {
            mode: mode.to_string(),
            member_node_uuids: change.keep_nodes.clone(),
            eject_node_uuids: change.eject_nodes.clone(),
        };
        let stop_rev = self.rebalancer.change_topology(spec, observer).await?;

        let change_id = change.id.clone();
        let rev = state.next_task_rev();
        let task = OrchestratorTask {
            id: task_id,
            rev,
            kind: TaskKind::Rebalance,
            status: TaskStatus::Running,
            cancelable: true,
            progress: 0.0,
            detailed_progress: BTreeMap::new(),
            description: "topology change".to_string(),
            error_message: String::new(),
            extra: TaskExtras::TopologyChange(change),
        };
        // Replace the prepared placeholder in place, keeping its ordinal
        // position in the list.
        state.handles_mut()[pos] = TaskHandle::new(task, Stop::Topology(stop_rev));
        self.registry.commit(&mut state);

        info!(change_id = %change_id, mode, "topology change started");
        Ok(())
    }

    /// Reserve a bucket pause.
    pub async fn prepare_pause(&self, params: PauseParams) -> OrchestratorResult<()> {
        let mut state = self.registry.lock().await;
        reject_conflicts(
            &state,
            &[
                TaskKind::Prepared,
                TaskKind::Rebalance,
                TaskKind::BucketPause,
                TaskKind::BucketResume,
            ],
        )?;
        self.hibernation
            .prepare_util(
                HibernationKind::Pause,
                &params.bucket,
                &params.blob_storage_region,
                params.rate_limit,
                params.dry_run,
            )
            .await?;

        let bucket = params.bucket.clone();
        let rev = state.next_task_rev();
        let task = OrchestratorTask {
            id: TaskPhase::Prepare.task_id(&params.id),
            rev,
            kind: TaskKind::Prepared,
            status: TaskStatus::Running,
            cancelable: true,
            progress: 1.0,
            detailed_progress: BTreeMap::new(),
            description: "prepare bucket pause".to_string(),
            error_message: String::new(),
            extra: TaskExtras::PausePrepare(params),
        };
        state.handles_mut().push(TaskHandle::new(task, Stop::None));
        self.registry.commit(&mut state);
        drop(state);

        self.topology.on_successful_prepare(false);
        info!(bucket = %bucket, "bucket pause prepared");
        Ok(())
    }

    /// Reserve a bucket resume. A dry run additionally validates the remote
    /// path; a bad path still admits the handle, flagged as `CannotResume`.
    pub async fn prepare_resume(&self, params: ResumeParams) -> OrchestratorResult<()> {
        let mut state = self.registry.lock().await;
        reject_conflicts(
            &state,
            &[
                TaskKind::Prepared,
                TaskKind::Rebalance,
                TaskKind::BucketPause,
                TaskKind::BucketResume,
            ],
        )?;
        self.hibernation
            .prepare_util(
                HibernationKind::Resume,
                &params.bucket,
                &params.blob_storage_region,
                params.rate_limit,
                params.dry_run,
            )
            .await?;

        let mut status = TaskStatus::Running;
        let mut error_message = String::new();
        if params.dry_run && self.hooks.remote_path_valid(&params.remote_path) == Some(false) {
            warn!(bucket = %params.bucket, remote_path = %params.remote_path, "remote path failed validation");
            status = TaskStatus::CannotResume;
            error_message = INVALID_REMOTE_PATH.to_string();
        }

        let bucket = params.bucket.clone();
        let rev = state.next_task_rev();
        let task = OrchestratorTask {
            id: TaskPhase::Prepare.task_id(&params.id),
            rev,
            kind: TaskKind::Prepared,
            status,
            cancelable: true,
            progress: 1.0,
            detailed_progress: BTreeMap::new(),
            description: "prepare bucket resume".to_string(),
            error_message,
            extra: TaskExtras::ResumePrepare(params),
        };
        state.handles_mut().push(TaskHandle::new(task, Stop::None));
        self.registry.commit(&mut state);
        drop(state);

        self.topology.on_successful_prepare(false);
        info!(bucket = %bucket, "bucket resume prepared");
        Ok(())
    }

    /// Start pausing a bucket out to blob storage.
    pub async fn pause(&self, params: PauseParams) -> OrchestratorResult<()> {
        let mut state = self.registry.lock().await;
        reject_conflicts(
            &state,
            &[
                TaskKind::Rebalance,
                TaskKind::BucketPause,
                TaskKind::BucketResume,
            ],
        )?;

        let task_id = TaskPhase::Hibernate.task_id(&params.id);
        let observer = Box::new(HibernationProgress::new(
            task_id.clone(),
            self.progress_tx.clone(),
        ));
        let remote_path = HibernationKind::Pause.decorate_path(&params.remote_path);
        self.hibernation
            .start_hibernation(
                params.dry_run,
                &params.bucket,
                &remote_path,
                HibernationKind::Pause,
                observer,
            )
            .await?;

        let bucket = params.bucket.clone();
        let rev = state.next_task_rev();
        let task = OrchestratorTask {
            id: task_id,
            rev,
            kind: TaskKind::BucketPause,
            status: TaskStatus::Running,
            cancelable: true,
            progress: 0.0,
            detailed_progress: BTreeMap::new(),
            description: "pause bucket".to_string(),
            error_message: String::new(),
            extra: TaskExtras::Pause(params),
        };
        state
            .handles_mut()
            .push(TaskHandle::new(task, Stop::Hibernation));
        self.registry.commit(&mut state);

        info!(bucket = %bucket, "bucket pause started");
        Ok(())
    }

    /// Start resuming a bucket back from blob storage.
    pub async fn resume(&self, params: ResumeParams) -> OrchestratorResult<()> {
        let mut state = self.registry.lock().await;
        reject_conflicts(
            &state,
            &[
                TaskKind::Rebalance,
                TaskKind::BucketPause,
                TaskKind::BucketResume,
            ],
        )?;

        let task_id = TaskPhase::Unhibernate.task_id(&params.id);
        let observer = Box::new(HibernationProgress::new(
            task_id.clone(),
            self.progress_tx.clone(),
        ));
        let remote_path = HibernationKind::Resume.decorate_path(&params.remote_path);
        self.hibernation
            .start_hibernation(
                params.dry_run,
                &params.bucket,
                &remote_path,
                HibernationKind::Resume,
                observer,
            )
            .await?;

        let bucket = params.bucket.clone();
        let rev = state.next_task_rev();
        let task = OrchestratorTask {
            id: task_id,
            rev,
            kind: TaskKind::BucketResume,
            status: TaskStatus::Running,
            cancelable: true,
            progress: 0.0,
            detailed_progress: BTreeMap::new(),
            description: "resume bucket".to_string(),
            error_message: String::new(),
            extra: TaskExtras::Resume(params),
        };
        state
            .handles_mut()
            .push(TaskHandle::new(task, Stop::Hibernation));
        self.registry.commit(&mut state);

        info!(bucket = %bucket, "bucket resume started");
        Ok(())
    }

    /// Cancel a task and stop its external work.
    pub async fn cancel_task(&self, id: &str, rev: Option<&Rev>) -> OrchestratorResult<()> {
        let stop = self.registry.cancel(id, rev).await?;
        match stop {
            Stop::None => {}
            Stop::Topology(rev) => self.rebalancer.stop_change_topology(&rev),
            Stop::Hibernation => {
                self.hibernation.stop_hibernation_task();
                self.hibernation.reset_bucket_tracked();
            }
        }
        info!(task_id = id, "task cancelled");
        Ok(())
    }

    /// Fatal termination. No graceful drain of the aggregator is promised.
    pub fn shutdown(&self) -> ! {
        info!("shutdown requested, terminating");
        std::process::exit(0)
    }

    async fn check_topology_rev(&self, supplied: Option<&Rev>) -> OrchestratorResult<()> {
        // An absent rev means "force": skip the optimistic check.
        let Some(supplied) = supplied else {
            return Ok(());
        };
        let current = self.topology.get_topology().await?.rev;
        if *supplied != current {
            return Err(OrchestratorError::Conflict(format!(
                "topology changed: supplied rev {supplied}, current {current}"
            )));
        }
        Ok(())
    }
}

/// Reject admission when any live handle carries one of `kinds`.
fn reject_conflicts(state: &RegistryState, kinds: &[TaskKind]) -> OrchestratorResult<()> {
    if let Some(handle) = state
        .handles()
        .iter()
        .find(|handle| kinds.contains(&handle.task.kind))
    {
        return Err(OrchestratorError::Conflict(format!(
            "task {} ({}) already in flight",
            handle.task.id,
            handle.task.kind.as_str()
        )));
    }
    Ok(())
}
