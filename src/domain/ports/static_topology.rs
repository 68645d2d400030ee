//! Static topology source implementation.
//!
//! Serves a fixed topology; `wait_topology` never resolves, so long-pollers
//! fall back to their timeout path. Used by the standalone daemon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::revision::Rev;
use crate::domain::models::topology::{NodeDef, SourceTopology};
use super::topology_source::TopologySource;

pub struct StaticTopologySource {
    topology: Mutex<SourceTopology>,
    orchestrator: AtomicBool,
}

impl StaticTopologySource {
    pub fn new(topology: SourceTopology) -> Self {
        Self {
            topology: Mutex::new(topology),
            orchestrator: AtomicBool::new(false),
        }
    }

    /// A single-node topology for the given local node.
    pub fn single_node(uuid: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self::new(SourceTopology {
            rev: Rev::encode(1),
            member_nodes: vec![NodeDef {
                uuid: uuid.into(),
                hostname: hostname.into(),
            }],
            ..SourceTopology::default()
        })
    }

    fn snapshot(&self) -> SourceTopology {
        self.topology
            .lock()
            .map(|topology| topology.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TopologySource for StaticTopologySource {
    async fn get_topology(&self) -> OrchestratorResult<SourceTopology> {
        Ok(self.snapshot())
    }

    async fn wait_topology(&self, _have_rev: &Rev) -> OrchestratorResult<SourceTopology> {
        // The topology never changes; callers time out and re-snapshot.
        std::future::pending().await
    }

    async fn check_and_reregister_self(&self, _node_uuid: &str) {}

    fn on_successful_prepare(&self, _is_topology: bool) {}

    fn set_task_orchestrator(&self, enabled: bool) {
        self.orchestrator.store(enabled, Ordering::SeqCst);
    }

    fn is_task_orchestrator(&self) -> bool {
        self.orchestrator.load(Ordering::SeqCst)
    }
}
