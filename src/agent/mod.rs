//! Agent lifecycle and integration glue

#[allow(clippy::module_inception)]
pub mod agent;
pub mod manager;

pub use agent::{CommitmentSettings, TradingAgent};
pub use manager::AgentManager;
