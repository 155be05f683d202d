pub mod agent;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod executor;
pub mod hook;
pub mod market;
pub mod reveal;
pub mod signing;
pub mod strategy;

pub use agent::{AgentManager, CommitmentSettings, TradingAgent};
pub use config::AppConfig;
pub use coordinator::{
    AgentReadinessSignal, BatchCoordinator, BatchParameters, BatchReadyEvent, ConflictResolution,
    CoordinatorConfig,
};
pub use domain::{
    CommitmentHash, MarketData, PoolKey, RevealData, SwapDirection, SwapIntent, TradeDecision,
    ZkProof,
};
pub use error::{Result, UmbraError};
pub use executor::{BatchExecutor, ExecutorConfig};
pub use hook::{HookApi, HookClient, HookRevert};
pub use reveal::RevealManager;
pub use signing::Wallet;
pub use strategy::{Strategy, StrategyKind, TradingLimits};
