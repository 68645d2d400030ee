//! Supervisor-facing task model.
//!
//! Tasks are immutable values published through the registry; every change
//! replaces the whole value under a fresh revision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::hibernation::{PauseParams, ResumeParams};
use super::revision::Rev;
use super::topology::TopologyChange;

/// Lifecycle phase a task id is namespaced under.
///
/// Task ids have the stable form `"<phase>:<caller id>"` so the supervisor
/// can correlate tasks with the requests that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    Prepare,
    Rebalance,
    Hibernate,
    Unhibernate,
}

impl TaskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Rebalance => "rebalance",
            Self::Hibernate => "hibernate",
            Self::Unhibernate => "unhibernate",
        }
    }

    /// Compose the stable task id for this phase and caller id.
    pub fn task_id(&self, caller_id: &str) -> String {
        format!("{}:{}", self.as_str(), caller_id)
    }
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of work a task handle stands for.
///
/// Kinds drive the admission exclusion rules: at most one `Prepared`, at
/// most one `Rebalance`, and `Rebalance`/`BucketPause`/`BucketResume` are
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    /// Zero-work placeholder reserving exclusion against competing entries.
    Prepared,
    Rebalance,
    BucketPause,
    BucketResume,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepared => "prepared",
            Self::Rebalance => "rebalance",
            Self::BucketPause => "bucketPause",
            Self::BucketResume => "bucketResume",
        }
    }
}

/// Externally visible status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Running,
    Failed,
    /// Resume admission succeeded but the dry-run path validation failed.
    CannotResume,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Failed => "failed",
            Self::CannotResume => "cannotResume",
        }
    }
}

/// Originating request parameters carried on the task.
///
/// The supervisor protocol only ever reads specific variants, so this is a
/// tagged union rather than a dynamic map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "camelCase")]
pub enum TaskExtras {
    TopologyChange(TopologyChange),
    PausePrepare(PauseParams),
    ResumePrepare(ResumeParams),
    Pause(PauseParams),
    Resume(ResumeParams),
}

/// Immutable task value published to the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorTask {
    /// Stable id of the form `"<phase>:<caller id>"`.
    pub id: String,
    /// Revision at last mutation.
    pub rev: Rev,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub cancelable: bool,
    /// Overall progress in [0, 1]. Prepared tasks are pinned at 1.0.
    pub progress: f64,
    /// Per-node progress in [0, 1]; may be empty.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detailed_progress: BTreeMap<String, f64>,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    pub extra: TaskExtras,
}

/// Versioned snapshot of the registry contents, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub rev: Rev,
    pub tasks: Vec<OrchestratorTask>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_format() {
        assert_eq!(TaskPhase::Prepare.task_id("A"), "prepare:A");
        assert_eq!(TaskPhase::Rebalance.task_id("A"), "rebalance:A");
        assert_eq!(TaskPhase::Hibernate.task_id("b-1"), "hibernate:b-1");
        assert_eq!(TaskPhase::Unhibernate.task_id("b-1"), "unhibernate:b-1");
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = OrchestratorTask {
            id: "rebalance:A".to_string(),
            rev: Rev::encode(3),
            kind: TaskKind::Rebalance,
            status: TaskStatus::Running,
            cancelable: true,
            progress: 0.5,
            detailed_progress: BTreeMap::new(),
            description: "topology change".to_string(),
            error_message: String::new(),
            extra: TaskExtras::TopologyChange(TopologyChange {
                id: "A".to_string(),
                current_topology_rev: None,
                change_type: super::super::topology::TopologyChangeType::Rebalance,
                keep_nodes: vec!["n1".to_string()],
                eject_nodes: vec![],
            }),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["rev"], "3");
        assert_eq!(json["kind"], "rebalance");
        assert_eq!(json["status"], "running");
        // Empty maps and messages stay off the wire.
        assert!(json.get("detailedProgress").is_none());
        assert!(json.get("errorMessage").is_none());
    }
}
