//! Mock collaborators shared by the integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use helmsman::domain::errors::{OrchestratorError, OrchestratorResult};
use helmsman::domain::models::{
    HibernationKind, HibernationTelemetry, RebalanceTelemetry, Rev, SourceTopology,
};
use helmsman::domain::ports::{
    ChangeTopologySpec, HibernationManager, HibernationObserver, RebalanceObserver,
    RebalanceStatus, Rebalancer, TopologySource,
};

/// Rebalancer that records calls and hands the observer back to the test.
pub struct MockRebalancer {
    pub specs: Mutex<Vec<ChangeTopologySpec>>,
    pub stopped: Mutex<Vec<Rev>>,
    observer: Mutex<Option<Box<dyn RebalanceObserver>>>,
    moving_partitions: AtomicUsize,
    next_rev: AtomicU64,
}

impl MockRebalancer {
    pub fn new(moving_partitions: usize) -> Self {
        Self {
            specs: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
            observer: Mutex::new(None),
            moving_partitions: AtomicUsize::new(moving_partitions),
            next_rev: AtomicU64::new(100),
        }
    }

    /// Drive the captured observer the way the real engine would.
    pub fn emit(&self, telemetry: Option<&RebalanceTelemetry>, errors: &[String]) -> String {
        let mut observer = self.observer.lock().unwrap();
        observer
            .as_mut()
            .expect("no rebalance observer captured")
            .on_progress(telemetry, errors)
    }

    pub fn has_observer(&self) -> bool {
        self.observer.lock().unwrap().is_some()
    }
}

#[async_trait]
impl Rebalancer for MockRebalancer {
    async fn change_topology(
        &self,
        spec: ChangeTopologySpec,
        observer: Box<dyn RebalanceObserver>,
    ) -> OrchestratorResult<Rev> {
        self.specs.lock().unwrap().push(spec);
        *self.observer.lock().unwrap() = Some(observer);
        Ok(Rev::encode(self.next_rev.fetch_add(1, Ordering::SeqCst)))
    }

    fn stop_change_topology(&self, rev: &Rev) {
        self.stopped.lock().unwrap().push(rev.clone());
    }

    fn last_rebalance_status(&self) -> OrchestratorResult<RebalanceStatus> {
        Ok(RebalanceStatus::NotStarted)
    }

    fn moving_partitions_count(&self) -> usize {
        self.moving_partitions.load(Ordering::SeqCst)
    }
}

/// Recorded hibernation manager call.
#[derive(Debug, Clone, PartialEq)]
pub struct HibernationCall {
    pub kind: HibernationKind,
    pub bucket: String,
    pub remote_path: String,
    pub dry_run: bool,
}

/// Hibernation manager that records calls and captures the observer.
pub struct MockHibernationManager {
    pub prepares: Mutex<Vec<HibernationCall>>,
    pub starts: Mutex<Vec<HibernationCall>>,
    pub stops: AtomicUsize,
    pub resets: AtomicUsize,
    prepare_error: Mutex<Option<String>>,
    observer: Mutex<Option<Box<dyn HibernationObserver>>>,
}

impl MockHibernationManager {
    pub fn new() -> Self {
        Self {
            prepares: Mutex::new(Vec::new()),
            starts: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            prepare_error: Mutex::new(None),
            observer: Mutex::new(None),
        }
    }

    /// Make the next `prepare_util` fail with this message.
    pub fn fail_prepare(&self, message: impl Into<String>) {
        *self.prepare_error.lock().unwrap() = Some(message.into());
    }

    pub fn emit(&self, telemetry: &HibernationTelemetry, errors: &[String]) {
        let mut observer = self.observer.lock().unwrap();
        observer
            .as_mut()
            .expect("no hibernation observer captured")
            .on_progress(telemetry, errors);
    }
}

#[async_trait]
impl HibernationManager for MockHibernationManager {
    async fn prepare_util(
        &self,
        kind: HibernationKind,
        bucket: &str,
        _region: &str,
        _rate_limit: u64,
        dry_run: bool,
    ) -> OrchestratorResult<()> {
        if let Some(message) = self.prepare_error.lock().unwrap().take() {
            return Err(OrchestratorError::Adapter(message));
        }
        self.prepares.lock().unwrap().push(HibernationCall {
            kind,
            bucket: bucket.to_string(),
            remote_path: String::new(),
            dry_run,
        });
        Ok(())
    }

    async fn start_hibernation(
        &self,
        dry_run: bool,
        bucket: &str,
        remote_path: &str,
        kind: HibernationKind,
        observer: Box<dyn HibernationObserver>,
    ) -> OrchestratorResult<()> {
        self.starts.lock().unwrap().push(HibernationCall {
            kind,
            bucket: bucket.to_string(),
            remote_path: remote_path.to_string(),
            dry_run,
        });
        *self.observer.lock().unwrap() = Some(observer);
        Ok(())
    }

    fn stop_hibernation_task(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn reset_bucket_tracked(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Topology source with a settable topology and real wait semantics.
pub struct MockTopologySource {
    topology: Mutex<SourceTopology>,
    changed: watch::Sender<u64>,
    pub reregistered: Mutex<Vec<String>>,
    pub prepare_signals: Mutex<Vec<bool>>,
    orchestrator: AtomicBool,
}

impl MockTopologySource {
    pub fn new(topology: SourceTopology) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            topology: Mutex::new(topology),
            changed,
            reregistered: Mutex::new(Vec::new()),
            prepare_signals: Mutex::new(Vec::new()),
            orchestrator: AtomicBool::new(false),
        }
    }

    pub fn set_topology(&self, topology: SourceTopology) {
        *self.topology.lock().unwrap() = topology;
        self.changed.send_modify(|generation| *generation += 1);
    }
}

#[async_trait]
impl TopologySource for MockTopologySource {
    async fn get_topology(&self) -> OrchestratorResult<SourceTopology> {
        Ok(self.topology.lock().unwrap().clone())
    }

    async fn wait_topology(&self, have_rev: &Rev) -> OrchestratorResult<SourceTopology> {
        let mut rx = self.changed.subscribe();
        loop {
            {
                let topology = self.topology.lock().unwrap();
                if topology.rev != *have_rev {
                    return Ok(topology.clone());
                }
            }
            if rx.changed().await.is_err() {
                return Ok(self.topology.lock().unwrap().clone());
            }
        }
    }

    async fn check_and_reregister_self(&self, node_uuid: &str) {
        self.reregistered.lock().unwrap().push(node_uuid.to_string());
    }

    fn on_successful_prepare(&self, is_topology: bool) {
        self.prepare_signals.lock().unwrap().push(is_topology);
    }

    fn set_task_orchestrator(&self, enabled: bool) {
        self.orchestrator.store(enabled, Ordering::SeqCst);
    }

    fn is_task_orchestrator(&self) -> bool {
        self.orchestrator.load(Ordering::SeqCst)
    }
}

impl Default for MockHibernationManager {
    fn default() -> Self {
        Self::new()
    }
}
