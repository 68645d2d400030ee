//! Core orchestrator services.

pub mod admission;
pub mod progress;
pub mod registry;
pub mod revision;
pub mod topology_view;

pub use admission::Orchestrator;
pub use progress::{
    progress_channel, run_progress_consumer, HibernationProgress, RebalanceProgress,
    PROGRESS_CHANNEL_CAPACITY,
};
pub use registry::{Stop, TaskHandle, TaskRegistry, DEFAULT_WAIT_TIMEOUT};
pub use revision::RevisionAllocator;
pub use topology_view::TopologyView;
