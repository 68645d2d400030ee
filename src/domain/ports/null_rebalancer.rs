//! Null rebalancer implementation.
//!
//! Used by the standalone daemon and in tests where no partition movement
//! engine is wired in.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::revision::Rev;
use super::rebalancer::{ChangeTopologySpec, RebalanceObserver, RebalanceStatus, Rebalancer};

/// A rebalancer that accepts every change and moves nothing.
#[derive(Debug, Default)]
pub struct NullRebalancer {
    next_rev: AtomicU64,
}

impl NullRebalancer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Rebalancer for NullRebalancer {
    async fn change_topology(
        &self,
        _spec: ChangeTopologySpec,
        mut observer: Box<dyn RebalanceObserver>,
    ) -> OrchestratorResult<Rev> {
        // No movement to perform: report immediate completion.
        observer.on_progress(None, &[]);
        Ok(Rev::encode(self.next_rev.fetch_add(1, Ordering::SeqCst)))
    }

    fn stop_change_topology(&self, _rev: &Rev) {}

    fn last_rebalance_status(&self) -> OrchestratorResult<RebalanceStatus> {
        Ok(RebalanceStatus::NotStarted)
    }

    fn moving_partitions_count(&self) -> usize {
        0
    }
}
