//! Supervisor-facing topology snapshot derivation.
//!
//! Wraps the topology source's own long-poll and reshapes its raw topology
//! into the supervisor's view: member uuids, a balance verdict, and a
//! normalized message list.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::revision::Rev;
use crate::domain::models::topology::{SourceTopology, Topology};
use crate::domain::ports::rebalancer::{RebalanceStatus, Rebalancer};
use crate::domain::ports::topology_source::TopologySource;
use super::registry::cancel_signal;

/// Warnings with this prefix collapse into one canonical message.
const CONSTRAINT_WARNING_PREFIX: &str = "could not meet constraints";
const NORMALIZED_CONSTRAINT_WARNING: &str = "could not meet replication constraints";

pub struct TopologyView {
    source: Arc<dyn TopologySource>,
    rebalancer: Arc<dyn Rebalancer>,
    wait_timeout: Duration,
    /// Last published snapshot. Independent of the registry mutex so
    /// topology queries never contend with task operations.
    last: Mutex<Option<Topology>>,
}

impl TopologyView {
    pub fn new(
        source: Arc<dyn TopologySource>,
        rebalancer: Arc<dyn Rebalancer>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            source,
            rebalancer,
            wait_timeout,
            last: Mutex::new(None),
        }
    }

    /// Current supervisor-facing topology, long-polling when `have_rev`
    /// matches the source's revision.
    pub async fn current(
        &self,
        have_rev: Option<&Rev>,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> OrchestratorResult<Topology> {
        let source_topology = match have_rev {
            None => self.source.get_topology().await?,
            Some(have) => {
                let current = self.source.get_topology().await?;
                if current.rev == *have {
                    self.wait_for_change(have, cancel).await?
                } else {
                    current
                }
            }
        };

        let snapshot = self.build(source_topology);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Most recently published snapshot, if any.
    pub fn last(&self) -> Option<Topology> {
        self.last.lock().map(|last| last.clone()).unwrap_or(None)
    }

    async fn wait_for_change(
        &self,
        have: &Rev,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> OrchestratorResult<SourceTopology> {
        let wait = self.source.wait_topology(have);
        tokio::pin!(wait);
        let cancelled = cancel_signal(cancel);
        tokio::pin!(cancelled);

        tokio::select! {
            topology = &mut wait => topology,
            () = &mut cancelled => {
                debug!("topology long-poll cancelled");
                Err(OrchestratorError::Cancelled)
            }
            () = tokio::time::sleep(self.wait_timeout) => self.source.get_topology().await,
        }
    }

    fn build(&self, source: SourceTopology) -> Topology {
        // Any rebalance still marked as started, or a failed status query,
        // counts as unbalanced.
        let rebalance_settled = match self.rebalancer.last_rebalance_status() {
            Ok(status) => status != RebalanceStatus::Started,
            Err(_) => false,
        };
        let warnings_clear = source.resource_warnings.values().all(Vec::is_empty);
        let is_balanced = warnings_clear && source.prev_errors.is_empty() && rebalance_settled;

        let mut messages = Vec::new();
        for (resource, warnings) in &source.resource_warnings {
            let mut seen = HashSet::new();
            for warning in warnings {
                let text = if warning.starts_with(CONSTRAINT_WARNING_PREFIX) {
                    NORMALIZED_CONSTRAINT_WARNING
                } else {
                    warning.as_str()
                };
                if seen.insert(text) {
                    messages.push(format!("warning: resource: \"{resource}\" -- {text}"));
                }
            }
        }
        messages.sort();
        for error in &source.prev_errors {
            messages.push(format!("error: {error}"));
        }

        Topology {
            rev: source.rev,
            nodes: source
                .member_nodes
                .iter()
                .map(|node| node.uuid.clone())
                .collect(),
            is_balanced,
            messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::models::topology::NodeDef;
    use crate::domain::ports::rebalancer::{ChangeTopologySpec, RebalanceObserver};

    struct StubRebalancer(OrchestratorResult<RebalanceStatus>);

    #[async_trait]
    impl Rebalancer for StubRebalancer {
        async fn change_topology(
            &self,
            _spec: ChangeTopologySpec,
            _observer: Box<dyn RebalanceObserver>,
        ) -> OrchestratorResult<Rev> {
            Ok(Rev::encode(0))
        }

        fn stop_change_topology(&self, _rev: &Rev) {}

        fn last_rebalance_status(&self) -> OrchestratorResult<RebalanceStatus> {
            match &self.0 {
                Ok(status) => Ok(*status),
                Err(_) => Err(OrchestratorError::Adapter("status unavailable".to_string())),
            }
        }

        fn moving_partitions_count(&self) -> usize {
            0
        }
    }

    struct StubSource(SourceTopology);

    #[async_trait]
    impl TopologySource for StubSource {
        async fn get_topology(&self) -> OrchestratorResult<SourceTopology> {
            Ok(self.0.clone())
        }

        async fn wait_topology(&self, _have_rev: &Rev) -> OrchestratorResult<SourceTopology> {
            std::future::pending().await
        }

        async fn check_and_reregister_self(&self, _node_uuid: &str) {}

        fn on_successful_prepare(&self, _is_topology: bool) {}

        fn set_task_orchestrator(&self, _enabled: bool) {}

        fn is_task_orchestrator(&self) -> bool {
            false
        }
    }

    fn source(warnings: Vec<&str>, prev_errors: Vec<&str>) -> SourceTopology {
        let mut resource_warnings = BTreeMap::new();
        resource_warnings.insert(
            "idx".to_string(),
            warnings.into_iter().map(str::to_string).collect(),
        );
        SourceTopology {
            rev: Rev::encode(7),
            member_nodes: vec![
                NodeDef { uuid: "n1".to_string(), hostname: String::new() },
                NodeDef { uuid: "n2".to_string(), hostname: String::new() },
            ],
            resource_warnings,
            prev_errors: prev_errors.into_iter().map(str::to_string).collect(),
        }
    }

    fn view(
        topology: SourceTopology,
        status: OrchestratorResult<RebalanceStatus>,
    ) -> TopologyView {
        TopologyView::new(
            Arc::new(StubSource(topology)),
            Arc::new(StubRebalancer(status)),
            Duration::from_secs(20),
        )
    }

    #[tokio::test]
    async fn test_warning_normalization_and_sorting() {
        let view = view(
            source(
                vec![
                    "could not meet constraints for N1",
                    "could not meet constraints for N2",
                    "index corrupt",
                ],
                vec![],
            ),
            Ok(RebalanceStatus::NotStarted),
        );
        let topology = view.current(None, None).await.unwrap();
        assert_eq!(
            topology.messages,
            vec![
                "warning: resource: \"idx\" -- could not meet replication constraints".to_string(),
                "warning: resource: \"idx\" -- index corrupt".to_string(),
            ]
        );
        assert!(!topology.is_balanced);
    }

    #[tokio::test]
    async fn test_errors_append_after_sorted_warnings() {
        let view = view(
            source(vec!["zzz late warning"], vec!["rebalance aborted"]),
            Ok(RebalanceStatus::NotStarted),
        );
        let topology = view.current(None, None).await.unwrap();
        assert_eq!(
            topology.messages,
            vec![
                "warning: resource: \"idx\" -- zzz late warning".to_string(),
                "error: rebalance aborted".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_balanced_when_clean() {
        let view = view(source(vec![], vec![]), Ok(RebalanceStatus::Finished));
        let topology = view.current(None, None).await.unwrap();
        assert!(topology.is_balanced);
        assert_eq!(topology.nodes, vec!["n1".to_string(), "n2".to_string()]);
        assert_eq!(topology.rev, Rev::encode(7));
    }

    #[tokio::test]
    async fn test_unbalanced_while_rebalance_running() {
        let view = view(source(vec![], vec![]), Ok(RebalanceStatus::Started));
        assert!(!view.current(None, None).await.unwrap().is_balanced);
    }

    #[tokio::test]
    async fn test_unbalanced_on_status_query_error() {
        let view = view(
            source(vec![], vec![]),
            Err(OrchestratorError::Adapter("status unavailable".to_string())),
        );
        assert!(!view.current(None, None).await.unwrap().is_balanced);
    }

    #[tokio::test]
    async fn test_unbalanced_on_prev_errors() {
        let view = view(source(vec![], vec!["boom"]), Ok(RebalanceStatus::NotStarted));
        assert!(!view.current(None, None).await.unwrap().is_balanced);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_poll_times_out_to_snapshot() {
        let view = view(source(vec![], vec![]), Ok(RebalanceStatus::NotStarted));
        // have_rev matches the source rev, the source never changes: the
        // timeout path re-snapshots.
        let topology = view.current(Some(&Rev::encode(7)), None).await.unwrap();
        assert_eq!(topology.rev, Rev::encode(7));
    }

    #[tokio::test]
    async fn test_long_poll_cancel() {
        let view = view(source(vec![], vec![]), Ok(RebalanceStatus::NotStarted));
        let (cancel_tx, cancel_rx) = oneshot::channel();
        drop(cancel_tx);
        let err = view
            .current(Some(&Rev::encode(7)), Some(cancel_rx))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Cancelled));
    }

    #[tokio::test]
    async fn test_last_snapshot_cached() {
        let view = view(source(vec![], vec![]), Ok(RebalanceStatus::Finished));
        assert!(view.last().is_none());
        let topology = view.current(None, None).await.unwrap();
        assert_eq!(view.last(), Some(topology));
    }
}
