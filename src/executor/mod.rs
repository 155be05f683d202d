//! Batch execution driver

#[allow(clippy::module_inception)]
pub mod executor;
pub mod history;

pub use executor::{BatchExecution, BatchExecutor, BatchReadiness, ExecutorConfig};
pub use history::{ExecutionRecord, ExecutionStats};
