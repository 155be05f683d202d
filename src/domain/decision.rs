//! Trade decisions emitted by the strategy runtime

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Swap direction relative to the pool's token ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// Sell token0 for token1
    ZeroForOne,
    /// Sell token1 for token0
    OneForZero,
}

impl SwapDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapDirection::ZeroForOne => "zero_for_one",
            SwapDirection::OneForZero => "one_for_zero",
        }
    }
}

impl std::fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one `should_trade` evaluation
#[derive(Debug, Clone)]
pub struct TradeDecision {
    pub should_trade: bool,
    pub direction: Option<SwapDirection>,
    pub amount_in: U256,
    pub min_amount_out: U256,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Human-readable explanation; carries the validation message on
    /// no-trade decisions
    pub reasoning: String,
}

impl TradeDecision {
    pub fn no_trade(reasoning: impl Into<String>) -> Self {
        Self {
            should_trade: false,
            direction: None,
            amount_in: U256::ZERO,
            min_amount_out: U256::ZERO,
            confidence: 0.0,
            reasoning: reasoning.into(),
        }
    }

    pub fn trade(
        direction: SwapDirection,
        amount_in: U256,
        min_amount_out: U256,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            should_trade: true,
            direction: Some(direction),
            amount_in,
            min_amount_out,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_clamps_confidence() {
        let d = TradeDecision::trade(
            SwapDirection::ZeroForOne,
            U256::from(1),
            U256::ZERO,
            1.7,
            "test",
        );
        assert_eq!(d.confidence, 1.0);
        assert!(d.should_trade);
    }

    #[test]
    fn no_trade_has_no_direction() {
        let d = TradeDecision::no_trade("cooldown active");
        assert!(!d.should_trade);
        assert!(d.direction.is_none());
        assert!(d.reasoning.contains("cooldown"));
    }
}
