//! Liquidity strategy
//!
//! Reads pool balance structure rather than price: reserve imbalance,
//! volume pressure relative to depth, and sudden liquidity shifts against
//! the previously observed baseline. The baseline updates after detection
//! on the same tick, so a single large swing signals once and then
//! becomes the new normal.

use std::collections::HashMap;

use alloy::primitives::{B256, U256};
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{MarketData, SwapDirection, TradeDecision};
use crate::strategy::toolkit::{
    clamp_amount, min_amount_out, validate_market_data, CooldownTracker, TradingLimits,
};
use crate::strategy::traits::Strategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityConfig {
    /// Ratio of the larger reserve to the smaller one that counts as
    /// imbalanced
    pub imbalance_threshold: f64,
    pub min_total_liquidity: U256,
    /// Zero means unbounded
    pub max_total_liquidity: U256,
    /// 1h volume over total liquidity that counts as pressure
    pub volume_to_liquidity_threshold: f64,
    pub cooldown_s: u64,
    /// Buy toward the thin side when true, fade it when false
    pub trade_into_imbalance: bool,
    pub min_confidence: f64,
    /// Position size as a fraction of total pool liquidity
    pub position_size_fraction: f64,
    pub detect_liquidity_changes: bool,
    pub liquidity_change_threshold_pct: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            imbalance_threshold: 2.0,
            min_total_liquidity: U256::ZERO,
            max_total_liquidity: U256::ZERO,
            volume_to_liquidity_threshold: 0.5,
            cooldown_s: 300,
            trade_into_imbalance: true,
            min_confidence: 0.3,
            position_size_fraction: 0.001,
            detect_liquidity_changes: true,
            liquidity_change_threshold_pct: 20.0,
        }
    }
}

/// Which reserve is the thin side of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThinSide {
    Token0,
    Token1,
    Balanced,
}

#[derive(Debug, Clone)]
struct LiquidityAnalysis {
    imbalance_ratio: f64,
    thin_side: ThinSide,
    volume_to_liquidity: f64,
}

pub struct LiquidityStrategy {
    config: LiquidityConfig,
    cooldowns: CooldownTracker,
    /// Last observed total liquidity per pool
    last_liquidity: HashMap<B256, U256>,
}

impl LiquidityStrategy {
    pub fn new(config: LiquidityConfig) -> Self {
        Self {
            config,
            cooldowns: CooldownTracker::new(),
            last_liquidity: HashMap::new(),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::seconds(self.config.cooldown_s as i64)
    }

    fn analyze(market: &MarketData) -> LiquidityAnalysis {
        let liq0 = u256_to_f64(market.liquidity0);
        let liq1 = u256_to_f64(market.liquidity1);
        let (larger, smaller) = if liq0 >= liq1 { (liq0, liq1) } else { (liq1, liq0) };

        let imbalance_ratio = if smaller > 0.0 {
            larger / smaller
        } else if larger > 0.0 {
            f64::INFINITY
        } else {
            1.0
        };

        let thin_side = if liq0 < liq1 {
            ThinSide::Token0
        } else if liq1 < liq0 {
            ThinSide::Token1
        } else {
            ThinSide::Balanced
        };

        let total = u256_to_f64(market.total_liquidity);
        let volume_to_liquidity = if total > 0.0 {
            u256_to_f64(market.volume_1h) / total
        } else {
            0.0
        };

        LiquidityAnalysis {
            imbalance_ratio,
            thin_side,
            volume_to_liquidity,
        }
    }

    /// Percent change of total liquidity against the stored baseline
    fn liquidity_change_pct(&self, pool_id: B256, total: U256) -> Option<f64> {
        let previous = self.last_liquidity.get(&pool_id)?;
        let prev = u256_to_f64(*previous);
        if prev <= 0.0 {
            return None;
        }
        let now = u256_to_f64(total);
        Some((now - prev).abs() / prev * 100.0)
    }
}

fn u256_to_f64(value: U256) -> f64 {
    // Lossy by design; only used for ratios, never amounts
    value.to_string().parse::<f64>().unwrap_or(f64::MAX)
}

#[async_trait]
impl Strategy for LiquidityStrategy {
    fn name(&self) -> &'static str {
        "liquidity"
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

        // Observe the baseline before any gate so every tick refreshes it
        let change_pct = self.liquidity_change_pct(market.pool_id, market.total_liquidity);
        if self.config.detect_liquidity_changes {
            self.last_liquidity
                .insert(market.pool_id, market.total_liquidity);
        }

        if self.cooldowns.is_active(market.pool_id, self.cooldown()) {
            return TradeDecision::no_trade(format!(
                "cooldown active for pool {}",
                market.pool_id
            ));
        }

        if market.total_liquidity < self.config.min_total_liquidity {
            return TradeDecision::no_trade(format!(
                "total liquidity {} below viable floor {}",
                market.total_liquidity, self.config.min_total_liquidity
            ));
        }
        if !self.config.max_total_liquidity.is_zero()
            && market.total_liquidity > self.config.max_total_liquidity
        {
            return TradeDecision::no_trade(format!(
                "total liquidity {} above viable ceiling {}",
                market.total_liquidity, self.config.max_total_liquidity
            ));
        }

        let analysis = Self::analyze(market);
        let mut confidence = 0.0f64;
        let mut signals: Vec<String> = Vec::new();

        let imbalanced = analysis.imbalance_ratio >= self.config.imbalance_threshold;
        if imbalanced {
            let severity = ((analysis.imbalance_ratio - self.config.imbalance_threshold)
                / self.config.imbalance_threshold)
                .clamp(0.0, 1.0);
            confidence += 0.3 + 0.4 * severity;
            signals.push(format!("imbalance ratio {:.2}", analysis.imbalance_ratio));
        }

        if analysis.volume_to_liquidity > self.config.volume_to_liquidity_threshold {
            confidence += if signals.is_empty() { 0.25 } else { 0.15 };
            signals.push(format!(
                "volume/liquidity {:.3}",
                analysis.volume_to_liquidity
            ));
        }

        if self.config.detect_liquidity_changes {
            if let Some(change) = change_pct {
                if change > self.config.liquidity_change_threshold_pct {
                    confidence += if signals.is_empty() { 0.2 } else { 0.1 };
                    signals.push(format!("liquidity moved {:.1}%", change));
                }
            }
        }

        if signals.is_empty() {
            return TradeDecision::no_trade("no liquidity signals".to_string());
        }

        if analysis.thin_side == ThinSide::Balanced {
            return TradeDecision::no_trade(
                "pool balanced, no direction for liquidity entry".to_string(),
            );
        }

        let confidence = confidence.clamp(0.0, 1.0);
        if confidence < self.config.min_confidence {
            return TradeDecision::no_trade(format!(
                "confidence {confidence:.2} below floor {:.2}",
                self.config.min_confidence
            ));
        }

        // liquidity0 > liquidity1 buys token0, mirrored on the other side;
        // inverted when fading the imbalance
        let toward_imbalance = match analysis.thin_side {
            ThinSide::Token1 => SwapDirection::OneForZero,
            ThinSide::Token0 => SwapDirection::ZeroForOne,
            ThinSide::Balanced => unreachable!("balanced handled above"),
        };
        let direction = if self.config.trade_into_imbalance {
            toward_imbalance
        } else {
            match toward_imbalance {
                SwapDirection::OneForZero => SwapDirection::ZeroForOne,
                SwapDirection::ZeroForOne => SwapDirection::OneForZero,
            }
        };

        // total_liquidity · fraction · confidence, quantized to millionths
        let ppm = U256::from(
            (self.config.position_size_fraction * confidence * 1_000_000.0)
                .clamp(0.0, 1_000_000.0)
                .floor() as u64,
        );
        let raw_amount = market.total_liquidity * ppm / U256::from(1_000_000u64);
        let amount_in = clamp_amount(raw_amount, limits);
        let min_out = min_amount_out(
            amount_in,
            market.current_price,
            direction,
            limits.default_slippage_bps,
        );

        self.cooldowns.record_trade(market.pool_id);
        debug!(
            pool_id = %market.pool_id,
            confidence,
            %direction,
            signals = ?signals,
            "liquidity entry"
        );

        TradeDecision::trade(
            direction,
            amount_in,
            min_out,
            confidence,
            format!("liquidity signals: {}", signals.join(", ")),
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
        self.last_liquidity.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PoolKey;
    use alloy::primitives::Address;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn market(liq0: u64, liq1: u64, volume_1h: u64) -> MarketData {
        let pool_key = PoolKey::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            3000,
            60,
            Address::repeat_byte(3),
        );
        MarketData {
            pool_id: pool_key.pool_id(),
            pool_key,
            current_price: dec!(1),
            price_change_1h: 0.0,
            price_change_24h: 0.0,
            total_liquidity: U256::from(liq0 + liq1),
            liquidity0: U256::from(liq0),
            liquidity1: U256::from(liq1),
            volume_1h: U256::from(volume_1h),
            volume_24h: U256::from(volume_1h * 10),
            recent_swaps: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    fn quiet_config() -> LiquidityConfig {
        LiquidityConfig {
            volume_to_liquidity_threshold: 100.0,
            detect_liquidity_changes: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn imbalance_buys_the_thin_token1() {
        let mut strategy = LiquidityStrategy::new(quiet_config());
        // token0 deep, token1 thin: buy token0 per the imbalance mapping
        let decision = strategy
            .should_trade(&market(3_000, 1_000, 0), &TradingLimits::default())
            .await;
        assert!(decision.should_trade);
        assert_eq!(decision.direction, Some(SwapDirection::OneForZero));
        assert!(decision.reasoning.contains("imbalance"));
    }

    #[tokio::test]
    async fn fading_the_imbalance_inverts_direction() {
        let mut strategy = LiquidityStrategy::new(LiquidityConfig {
            trade_into_imbalance: false,
            ..quiet_config()
        });
        let decision = strategy
            .should_trade(&market(3_000, 1_000, 0), &TradingLimits::default())
            .await;
        assert!(decision.should_trade);
        assert_eq!(decision.direction, Some(SwapDirection::ZeroForOne));
    }

    #[tokio::test]
    async fn balanced_pool_without_direction_stays_out() {
        let mut strategy = LiquidityStrategy::new(LiquidityConfig {
            volume_to_liquidity_threshold: 0.1,
            detect_liquidity_changes: false,
            ..Default::default()
        });
        // Volume pressure fires but the reserves are equal
        let decision = strategy
            .should_trade(&market(2_000, 2_000, 1_000), &TradingLimits::default())
            .await;
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("balanced"));
    }

    #[tokio::test]
    async fn volume_pressure_adds_confidence() {
        let base = LiquidityConfig {
            volume_to_liquidity_threshold: 0.2,
            detect_liquidity_changes: false,
            min_confidence: 0.1,
            ..Default::default()
        };
        let mut quiet = LiquidityStrategy::new(LiquidityConfig {
            volume_to_liquidity_threshold: 100.0,
            ..base.clone()
        });
        let mut busy = LiquidityStrategy::new(base);
        let m = market(3_000, 1_000, 2_000);

        let without = quiet.should_trade(&m, &TradingLimits::default()).await;
        let with = busy.should_trade(&m, &TradingLimits::default()).await;
        assert!(with.confidence > without.confidence);
    }

    #[tokio::test]
    async fn liquidity_swing_signals_once_then_rebaselines() {
        let mut strategy = LiquidityStrategy::new(LiquidityConfig {
            imbalance_threshold: 100.0,
            volume_to_liquidity_threshold: 100.0,
            liquidity_change_threshold_pct: 20.0,
            min_confidence: 0.1,
            cooldown_s: 0,
            ..Default::default()
        });
        let limits = TradingLimits::default();

        // First tick records the baseline, no signal yet
        let first = strategy
            .should_trade(&market(3_000, 1_000, 0), &limits)
            .await;
        assert!(!first.should_trade);

        // Liquidity doubles: change signal fires
        let second = strategy
            .should_trade(&market(6_000, 2_000, 0), &limits)
            .await;
        assert!(second.should_trade);
        assert!(second.reasoning.contains("liquidity moved"));

        // Same level again: the swing became the new baseline
        let third = strategy
            .should_trade(&market(6_000, 2_000, 0), &limits)
            .await;
        assert!(!third.should_trade);
    }

    #[tokio::test]
    async fn viability_bounds_reject_pool() {
        let mut strategy = LiquidityStrategy::new(LiquidityConfig {
            min_total_liquidity: U256::from(10_000u64),
            ..quiet_config()
        });
        let decision = strategy
            .should_trade(&market(3_000, 1_000, 0), &TradingLimits::default())
            .await;
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("below viable floor"));

        let mut strategy = LiquidityStrategy::new(LiquidityConfig {
            max_total_liquidity: U256::from(1_000u64),
            ..quiet_config()
        });
        let decision = strategy
            .should_trade(&market(3_000, 1_000, 0), &TradingLimits::default())
            .await;
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("above viable ceiling"));
    }

    #[tokio::test]
    async fn amount_stays_clamped_to_limits() {
        let limits = TradingLimits {
            min_amount_in: U256::from(10u64),
            max_amount_in: U256::from(20u64),
            default_slippage_bps: 50,
        };
        let mut strategy = LiquidityStrategy::new(quiet_config());
        let decision = strategy
            .should_trade(&market(3_000_000, 1_000_000, 0), &limits)
            .await;
        assert!(decision.should_trade);
        assert!(decision.amount_in >= limits.min_amount_in);
        assert!(decision.amount_in <= limits.max_amount_in);
    }
}
