//! Multi-agent batch coordination

pub mod config;
#[allow(clippy::module_inception)]
pub mod coordinator;
pub mod state;

pub use config::{ConflictResolution, CoordinatorConfig};
pub use coordinator::BatchCoordinator;
pub use state::{AgentReadinessSignal, BatchParameters, BatchReadyEvent, PoolStatus};
