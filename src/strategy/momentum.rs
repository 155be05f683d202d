//! Momentum strategy
//!
//! Trades in the direction of a weighted composite of the 1h and 24h
//! price changes, with optional volume and recent-swap trend
//! confirmation.

use alloy::primitives::{B256, U256};
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{MarketData, SwapDirection, TradeDecision};
use crate::strategy::toolkit::{
    clamp_amount, min_amount_out, scale_amount, validate_market_data, CooldownTracker,
    TradingLimits,
};
use crate::strategy::traits::Strategy;

/// Share of the trend-confirmation window that must align with the
/// composite direction
const TREND_ALIGNMENT_FRACTION: f64 = 0.6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Minimum 1h move (percent) contributing to the entry threshold
    pub threshold_1h_pct: f64,
    /// Minimum 24h move (percent) contributing to the entry threshold
    pub threshold_24h_pct: f64,
    /// Weight of the 1h change in the composite
    pub short_weight: f64,
    /// Weight of the 24h change in the composite
    pub long_weight: f64,
    /// 1h volume floor when volume confirmation is on
    pub min_volume_threshold: U256,
    pub cooldown_s: u64,
    /// Reject when either window moves more than this (percent)
    pub max_volatility_pct: f64,
    pub require_volume_confirmation: bool,
    /// Number of recent swaps inspected for trend confirmation; 0 skips
    /// the check
    pub trend_confirmation_swaps: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            threshold_1h_pct: 1.0,
            threshold_24h_pct: 2.0,
            short_weight: 0.6,
            long_weight: 0.4,
            min_volume_threshold: U256::ZERO,
            cooldown_s: 300,
            max_volatility_pct: 50.0,
            require_volume_confirmation: false,
            trend_confirmation_swaps: 5,
        }
    }
}

pub struct MomentumStrategy {
    config: MomentumConfig,
    cooldowns: CooldownTracker,
}

impl MomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        Self {
            config,
            cooldowns: CooldownTracker::new(),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::seconds(self.config.cooldown_s as i64)
    }

    /// Fraction of the recent-swap window aligned with the expected
    /// trend. An uptrend expects buys of token1 (`zero_for_one == false`).
    fn trend_multiplier(&self, market: &MarketData, uptrend: bool) -> f64 {
        if self.config.trend_confirmation_swaps == 0 {
            return 1.0;
        }
        let window: Vec<_> = market
            .recent_swaps
            .iter()
            .rev()
            .take(self.config.trend_confirmation_swaps)
            .collect();
        if window.is_empty() {
            return 1.0;
        }
        let aligned = window
            .iter()
            .filter(|s| s.zero_for_one != uptrend)
            .count();
        let fraction = aligned as f64 / window.len() as f64;
        if fraction >= TREND_ALIGNMENT_FRACTION {
            1.2
        } else {
            0.7
        }
    }

    fn zone_confidence(change_pct: f64, threshold: f64) -> f64 {
        if threshold > 0.0 {
            change_pct.abs() / (3.0 * threshold)
        } else {
            1.0
        }
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    fn name(&self) -> &'static str {
        "momentum"
    }

    async fn should_trade(
        &mut self,
        market: &MarketData,
        limits: &TradingLimits,
    ) -> TradeDecision {
        let report = validate_market_data(market);
        if !report.is_valid {
            return TradeDecision::no_trade(format!(
                "invalid market data: {}",
                report.errors.join("; ")
            ));
        }

        if self.cooldowns.is_active(market.pool_id, self.cooldown()) {
            return TradeDecision::no_trade(format!(
                "cooldown active for pool {}",
                market.pool_id
            ));
        }

        let d1h = market.price_change_1h;
        let d24h = market.price_change_24h;

        if d1h.abs() > self.config.max_volatility_pct
            || d24h.abs() > self.config.max_volatility_pct
        {
            return TradeDecision::no_trade(format!(
                "volatility above {:.1}% cap (1h={d1h:.2}%, 24h={d24h:.2}%)",
                self.config.max_volatility_pct
            ));
        }

        let composite = d1h * self.config.short_weight + d24h * self.config.long_weight;
        let entry_floor = self.config.threshold_1h_pct * self.config.short_weight
            + self.config.threshold_24h_pct * self.config.long_weight;
        if composite.abs() < entry_floor {
            return TradeDecision::no_trade(format!(
                "composite momentum {composite:.3}% below entry floor {entry_floor:.3}%"
            ));
        }

        if self.config.require_volume_confirmation
            && market.volume_1h < self.config.min_volume_threshold
        {
            return TradeDecision::no_trade(format!(
                "1h volume {} below confirmation floor {}",
                market.volume_1h, self.config.min_volume_threshold
            ));
        }

        let uptrend = composite > 0.0;
        let direction = if uptrend {
            SwapDirection::ZeroForOne
        } else {
            SwapDirection::OneForZero
        };

        let short_conf = Self::zone_confidence(d1h, self.config.threshold_1h_pct);
        let long_conf = Self::zone_confidence(d24h, self.config.threshold_24h_pct);
        let mut confidence =
            short_conf * self.config.short_weight + long_conf * self.config.long_weight;

        // Bonus when both windows agree on direction, penalty when they
        // fight each other
        let agreement = d1h * d24h;
        if agreement > 0.0 {
            confidence += 0.15;
        } else if agreement < 0.0 {
            confidence -= 0.15;
        }

        confidence *= self.trend_multiplier(market, uptrend);
        let confidence = confidence.clamp(0.1, 1.0);

        let amount_in = clamp_amount(scale_amount(confidence, limits), limits);
        let min_out = min_amount_out(
            amount_in,
            market.current_price,
            direction,
            limits.default_slippage_bps,
        );

        self.cooldowns.record_trade(market.pool_id);
        debug!(
            pool_id = %market.pool_id,
            composite,
            confidence,
            %direction,
            "momentum entry"
        );

        TradeDecision::trade(
            direction,
            amount_in,
            min_out,
            confidence,
            format!(
                "composite momentum {composite:.2}% (1h={d1h:.2}%, 24h={d24h:.2}%), confidence {confidence:.2}"
            ),
        )
    }

    fn record_trade(&mut self, pool_id: B256) {
        self.cooldowns.record_trade(pool_id);
    }

    fn is_cooldown_active(&self, pool_id: B256) -> bool {
        self.cooldowns.is_active(pool_id, self.cooldown())
    }

    fn reset(&mut self) {
        self.cooldowns.clear();
    }
}
