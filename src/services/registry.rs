//! Versioned task registry with long-poll semantics.
//!
//! All handle state lives behind one mutex. Every mutation allocates a new
//! registry revision and bumps a watch channel; long-pollers subscribe,
//! compare, and wait for the value to move.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch, Mutex, MutexGuard};
use tracing::debug;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::revision::Rev;
use crate::domain::models::task::{OrchestratorTask, TaskList};
use super::revision::RevisionAllocator;

/// Default time a long-poll waits before returning the current snapshot.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(20);

/// How to stop a task's underlying external work.
///
/// Interpreted centrally by the orchestrator when a task is cancelled, so
/// the registry never holds collaborator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stop {
    /// Nothing to stop (prepared placeholders).
    None,
    /// Stop the topology change identified by this revision.
    Topology(Rev),
    /// Stop the in-flight hibernation task.
    Hibernation,
}

/// Registry record for one task: the published value plus its stop action.
/// Records are replaced wholesale, never mutated in place.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub started_at: DateTime<Utc>,
    pub task: OrchestratorTask,
    pub stop: Stop,
}

impl TaskHandle {
    pub fn new(task: OrchestratorTask, stop: Stop) -> Self {
        Self {
            started_at: Utc::now(),
            task,
            stop,
        }
    }
}

/// Guarded registry state. Admission entry points and the progress
/// consumer work on this through [`TaskRegistry::lock`] and finish every
/// mutation with [`TaskRegistry::commit`].
#[derive(Debug)]
pub struct RegistryState {
    rev_num: u64,
    handles: Vec<TaskHandle>,
    allocator: RevisionAllocator,
}

impl RegistryState {
    fn new() -> Self {
        let mut allocator = RevisionAllocator::new();
        let rev_num = allocator.alloc(0);
        Self {
            rev_num,
            handles: Vec::new(),
            allocator,
        }
    }

    /// Allocate a fresh revision for a task value.
    pub fn next_task_rev(&mut self) -> Rev {
        Rev::encode(self.allocator.alloc(0))
    }

    pub fn handles(&self) -> &[TaskHandle] {
        &self.handles
    }

    pub fn handles_mut(&mut self) -> &mut Vec<TaskHandle> {
        &mut self.handles
    }

    pub fn find(&self, id: &str) -> Option<usize> {
        self.handles.iter().position(|handle| handle.task.id == id)
    }

    fn snapshot(&self) -> TaskList {
        TaskList {
            rev: Rev::encode(self.rev_num),
            tasks: self.handles.iter().map(|handle| handle.task.clone()).collect(),
        }
    }
}

/// Ordered task handles behind a single mutex, long-pollable by revision.
#[derive(Debug)]
pub struct TaskRegistry {
    state: Mutex<RegistryState>,
    changed: watch::Sender<u64>,
    wait_timeout: Duration,
}

impl TaskRegistry {
    pub fn new(wait_timeout: Duration) -> Self {
        let state = RegistryState::new();
        let (changed, _) = watch::channel(state.rev_num);
        Self {
            state: Mutex::new(state),
            changed,
            wait_timeout,
        }
    }

    /// Lock the registry state. Admission entry points hold this across
    /// collaborator calls to serialize admission against progress
    /// application.
    pub async fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().await
    }

    /// Bump the registry revision and wake long-pollers. Call exactly once
    /// per mutation, while still holding the state lock.
    pub fn commit(&self, state: &mut RegistryState) {
        state.rev_num = state.allocator.alloc(state.rev_num);
        self.changed.send_replace(state.rev_num);
    }

    /// Apply `f` under the lock, then commit.
    pub async fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut RegistryState),
    {
        let mut state = self.state.lock().await;
        f(&mut state);
        self.commit(&mut state);
    }

    /// Current snapshot without waiting.
    pub async fn snapshot(&self) -> TaskList {
        self.state.lock().await.snapshot()
    }

    /// Long-poll the task list.
    ///
    /// With no `have_rev` the current snapshot returns immediately. When
    /// `have_rev` matches the current revision, blocks until a mutation
    /// lands, `cancel` fires, or the wait timeout elapses; the timeout path
    /// returns the current snapshot rather than an error.
    pub async fn list(
        &self,
        have_rev: Option<&Rev>,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> OrchestratorResult<TaskList> {
        let Some(have_rev) = have_rev else {
            return Ok(self.snapshot().await);
        };
        let have = have_rev.decode()?;

        let mut rx = self.changed.subscribe();
        let cancelled = cancel_signal(cancel);
        tokio::pin!(cancelled);
        let deadline = tokio::time::sleep(self.wait_timeout);
        tokio::pin!(deadline);

        loop {
            if *rx.borrow_and_update() != have {
                return Ok(self.snapshot().await);
            }
            tokio::select! {
                changed = rx.changed() => {
                    // The sender lives as long as the registry; a closed
                    // channel just degrades to the snapshot path.
                    if changed.is_err() {
                        return Ok(self.snapshot().await);
                    }
                }
                () = &mut cancelled => {
                    debug!("task list long-poll cancelled");
                    return Err(OrchestratorError::Cancelled);
                }
                () = &mut deadline => return Ok(self.snapshot().await),
            }
        }
    }

    /// Cancel the task with the given id, removing its handle.
    ///
    /// Returns the handle's [`Stop`] action for the caller to dispatch;
    /// stop actions are non-blocking and idempotent, so dispatching after
    /// removal is equivalent to the reverse order.
    pub async fn cancel(&self, id: &str, expected_rev: Option<&Rev>) -> OrchestratorResult<Stop> {
        let mut state = self.state.lock().await;
        let Some(pos) = state.find(id) else {
            return Err(OrchestratorError::NotFound(format!("task {id}")));
        };
        let handle = &state.handles[pos];
        if let Some(expected) = expected_rev {
            if *expected != handle.task.rev {
                return Err(OrchestratorError::Conflict(format!(
                    "task {id} changed: expected rev {expected}, current {}",
                    handle.task.rev
                )));
            }
        }
        if !handle.task.cancelable {
            return Err(OrchestratorError::NotSupported(format!(
                "task {id} is not cancelable"
            )));
        }
        let handle = state.handles.remove(pos);
        self.commit(&mut state);
        debug!(task_id = id, "task handle removed");
        Ok(handle.stop)
    }
}

/// Resolve when the optional cancel signal fires (a dropped sender counts
/// as a cancel); never resolves when no signal was supplied.
pub(crate) async fn cancel_signal(cancel: Option<oneshot::Receiver<()>>) {
    match cancel {
        Some(rx) => {
            let _ = rx.await;
        }
        None => std::future::pending().await,
    }
}
