//! Core value types shared across the agent runtime

pub mod decision;
pub mod intent;
pub mod market;
pub mod pool;
pub mod zk;

pub use decision::{SwapDirection, TradeDecision};
pub use intent::{CommitmentHash, RevealData, SwapIntent};
pub use market::{MarketData, RecentSwap};
pub use pool::PoolKey;
pub use zk::{NullProofGenerator, ProofGenerator, ZkProof};
