//! Domain models for the orchestrator.

pub mod config;
pub mod hibernation;
pub mod revision;
pub mod task;
pub mod telemetry;
pub mod topology;

pub use config::{Config, HttpConfig, LogConfig, NodeConfig, RegistryConfig};
pub use hibernation::{HibernationKind, PauseParams, ResumeParams};
pub use revision::Rev;
pub use task::{OrchestratorTask, TaskExtras, TaskKind, TaskList, TaskPhase, TaskStatus};
pub use telemetry::{
    HibernationTelemetry, PartitionEntry, RebalanceTelemetry, TaskProgressUpdate, UuidSeq,
};
pub use topology::{NodeDef, NodeInfo, SourceTopology, Topology, TopologyChange, TopologyChangeType};
