//! Core strategy trait
//!
//! A strategy is any component that turns a market snapshot into a trade
//! decision. Shared helpers (validation, cooldown, sizing, min-out) live
//! in the toolkit and are used by composition.

use alloy::primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{MarketData, TradeDecision};
use crate::strategy::toolkit::TradingLimits;

/// Core trait all trading strategies implement
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy identifier used in logs and readiness signals
    fn name(&self) -> &'static str;

    /// Evaluate one market snapshot. Emitting a trade records the pool's
    /// cooldown timestamp.
    async fn should_trade(&mut self, market: &MarketData, limits: &TradingLimits)
        -> TradeDecision;

    /// Stamp the cooldown clock for a pool
    fn record_trade(&mut self, pool_id: B256);

    /// Whether the per-pool cooldown currently blocks trading
    fn is_cooldown_active(&self, pool_id: B256) -> bool;

    /// Drop accumulated per-pool state (for a new session)
    fn reset(&mut self) {}
}

/// Which strategy an agent runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Momentum,
    Arbitrage,
    Liquidity,
    MeanReversion,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Momentum => "momentum",
            StrategyKind::Arbitrage => "arbitrage",
            StrategyKind::Liquidity => "liquidity",
            StrategyKind::MeanReversion => "mean_reversion",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "momentum" => Ok(StrategyKind::Momentum),
            "arbitrage" | "arb" => Ok(StrategyKind::Arbitrage),
            "liquidity" => Ok(StrategyKind::Liquidity),
            "mean_reversion" | "mean-reversion" | "meanreversion" => Ok(StrategyKind::MeanReversion),
            _ => Err("invalid strategy; expected momentum|arbitrage|liquidity|mean_reversion"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!(StrategyKind::from_str("momentum"), Ok(StrategyKind::Momentum));
        assert_eq!(StrategyKind::from_str("arb"), Ok(StrategyKind::Arbitrage));
        assert_eq!(
            StrategyKind::from_str("mean-reversion"),
            Ok(StrategyKind::MeanReversion)
        );
        assert!(StrategyKind::from_str("hodl").is_err());
    }
}
