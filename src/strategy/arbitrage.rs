//! Arbitrage strategy
//!
//! Compares the pool price against external reference prices and trades
//! toward the widest profitable spread. References come from static
//! config plus prices injected at runtime; anything older than five
//! minutes is discarded.

use std::collections::HashMap;

use alloy::primitives::{B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{MarketData, SwapDirection, TradeDecision};
use crate::strategy::toolkit::{
    clamp_amount, min_amount_out, scale_amount, validate_market_data, CooldownTracker,
    TradingLimits,
};
use crate::strategy::traits::Strategy;

/// Reference prices older than this are discarded
const REFERENCE_MAX_AGE_SECS: i64 = 300;

fn default_source_confidence() -> f64 {
    0.8
}

/// One external price observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub source: String,
    pub price: Decimal,
    /// How much the source itself is trusted, in [0, 1]
    #[serde(default = "default_source_confidence")]
    pub confidence: f64,
    /// None marks a static config entry that never goes stale
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    /// Spread floor (percent) below which an opportunity is noise
    pub min_spread_pct: f64,
    /// Spread cap (percent) above which the reference is suspect
    pub max_spread_pct: f64,
    /// Gas cost estimate in input-token units
    pub estimated_gas_cost: U256,
    /// Required profit after gas, in input-token units
    pub min_net_profit: U256,
    #[serde(default)]
    pub reference_prices: Vec<ReferencePrice>,
    pub cooldown_s: u64,
    pub min_liquidity: U256,
    pub max_slippage_bps: u32,
    /// Per-source weight applied to confidence; unlisted sources weigh 1.0
    #[serde(default)]
    pub source_weights: HashMap<String, f64>,
    /// Also consider references injected for other pools
    #[serde(default)]
    pub enable_cross_pool: bool,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_spread_pct: 0.5,
            max_spread_pct: 10.0,
            estimated_gas_cost: U256::ZERO,
            min_net_profit: U256::ZERO,
            reference_prices: Vec::new(),
            cooldown_s: 120,
            min_liquidity: U256::ZERO,
            max_slippage_bps: 100,
            source_weights: HashMap::new(),
            enable_cross_pool: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Opportunity {
    source: String,
    spread_pct: f64,
    direction: SwapDirection,
    confidence: f64,
}

pub struct ArbitrageStrategy {
    config: ArbitrageConfig,
    cooldowns: CooldownTracker,
    /// Runtime-injected references, keyed by pool
    injected: HashMap<B256, Vec<ReferencePrice>>,
}

impl ArbitrageStrategy {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self {
            config,
            cooldowns: CooldownTracker::new(),
            injected: HashMap::new(),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::seconds(self.config.cooldown_s as i64)
    }

    /// Inject a fresh reference price for a pool, replacing any previous
    /// entry from the same source
    pub fn update_reference_price(&mut self, pool_id: B256, source: impl Into<String>, price: Decimal) {
        let source = source.into();
        let entry = ReferencePrice {
            source: source.clone(),
            price,
            confidence: default_source_confidence(),
            timestamp: Some(Utc::now()),
        };
        let refs = self.injected.entry(pool_id).or_default();
        refs.retain(|r| r.source != source);
        refs.push(entry);
    }

    fn is_fresh(reference: &ReferencePrice) -> bool {
        match reference.timestamp {
            None => true,
            Some(ts) => Utc::now() - ts <= Duration::seconds(REFERENCE_MAX_AGE_SECS),
        }
    }

    fn candidate_references(&self, pool_id: B256) -> Vec<&ReferencePrice> {
        let mut refs: Vec<&ReferencePrice> = self.config.reference_prices.iter().collect();
        if let Some(injected) = self.injected.get(&pool_id) {
            refs.extend(injected.iter());
        }
        if self.config.enable_cross_pool {
            refs.extend(
                self.injected
                    .iter()
                    .filter(|(id, _)| **id != pool_id)
                    .flat_map(|(_, v)| v.iter()),
            );
        }
        refs.retain(|r| Self::is_fresh(r));
        refs
    }

    fn evaluate_reference(&self, reference: &ReferencePrice, current: f64) -> Option<Opportunity> {
        let ref_price = reference.price.to_f64()?;
        if current <= 0.0 {
            return None;
        }
        let spread_pct = (ref_price - current) / current * 100.0;
        if spread_pct.abs() < self.config.min_spread_pct
            || spread_pct.abs() > self.config.max_spread_pct
        {
            return None;
        }

        // Pool below reference: underpriced, buy token0. Above: sell it.
        let direction = if spread_pct > 0.0 {
            SwapDirection::OneForZero
        } else {
            SwapDirection::ZeroForOne
        };

        let weight = self
            .config
            .source_weights
            .get(&reference.source)
            .copied()
            .unwrap_or(1.0);
        let confidence = (spread_pct.abs() / (5.0 * self.config.min_spread_pct)
            * reference.confidence
            * weight)
            .clamp(0.1, 1.0);

        Some(Opportunity {
            source: reference.source.clone(),
            spread_pct,
            direction,
            confidence,
        })
    }
}

#[async_trait]
impl Strategy for ArbitrageStrategy {
    fn name(&self) -> &'static str {
        "arbitrage"
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

        if market.total_liquidity < self.config.min_liquidity {
            return TradeDecision::no_trade(format!(
                "liquidity {} below floor {}",
                market.total_liquidity, self.config.min_liquidity
            ));
        }

        let Some(current) = market.current_price.to_f64() else {
            return TradeDecision::no_trade("pool price not representable".to_string());
        };

        let best = self
            .candidate_references(market.pool_id)
            .into_iter()
            .filter_map(|r| self.evaluate_reference(r, current))
            .max_by(|a, b| {
                let score_a = a.spread_pct.abs() * a.confidence;
                let score_b = b.spread_pct.abs() * b.confidence;
                score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
            });

        let Some(opportunity) = best else {
            return TradeDecision::no_trade("no arbitrage opportunity in range".to_string());
        };

        let size_factor =
            (opportunity.confidence * opportunity.spread_pct.abs() / 2.0).min(1.0);
        let amount_in = clamp_amount(scale_amount(size_factor, limits), limits);

        // Profit gate: captured spread on the traded amount must clear
        // gas plus the configured margin
        let spread_bps = U256::from((opportunity.spread_pct.abs() * 100.0).floor() as u64);
        let estimated_profit = amount_in * spread_bps / U256::from(10_000u64);
        let required = self
            .config
            .estimated_gas_cost
            .saturating_add(self.config.min_net_profit);
        if estimated_profit < required {
            return TradeDecision::no_trade(format!(
                "estimated profit {} below gas+margin {}",
                estimated_profit, required
            ));
        }

        let min_out = min_amount_out(
            amount_in,
            market.current_price,
            opportunity.direction,
            self.config.max_slippage_bps,
        );

        self.cooldowns.record_trade(market.pool_id);
        debug!(
            pool_id = %market.pool_id,
            source = %opportunity.source,
            spread_pct = opportunity.spread_pct,
            confidence = opportunity.confidence,
            "arbitrage entry"
        );

        TradeDecision::trade(
            opportunity.direction,
            amount_in,
            min_out,
            opportunity.confidence,
            format!(
                "spread {:.2}% vs {} (confidence {:.2})",
                opportunity.spread_pct, opportunity.source, opportunity.confidence
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
        self.injected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PoolKey;
    use alloy::primitives::Address;
    use rust_decimal_macros::dec;

    fn market(price: Decimal) -> MarketData {
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
            current_price: price,
            price_change_1h: 0.0,
            price_change_24h: 0.0,
            total_liquidity: U256::from(1_000_000u64),
            liquidity0: U256::from(500_000u64),
            liquidity1: U256::from(500_000u64),
            volume_1h: U256::from(10_000u64),
            volume_24h: U256::from(100_000u64),
            recent_swaps: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    fn static_ref(source: &str, price: Decimal) -> ReferencePrice {
        ReferencePrice {
            source: source.to_string(),
            price,
            confidence: 1.0,
            timestamp: None,
        }
    }

    fn config_with_refs(refs: Vec<ReferencePrice>) -> ArbitrageConfig {
        ArbitrageConfig {
            min_spread_pct: 1.0,
            max_spread_pct: 10.0,
            reference_prices: refs,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn underpriced_pool_buys_token0() {
        let mut strategy =
            ArbitrageStrategy::new(config_with_refs(vec![static_ref("oracle", dec!(103))]));
        let decision = strategy
            .should_trade(&market(dec!(100)), &TradingLimits::default())
            .await;

        assert!(decision.should_trade);
        assert_eq!(decision.direction, Some(SwapDirection::OneForZero));
        assert!(decision.reasoning.contains("oracle"));
    }

    #[tokio::test]
    async fn overpriced_pool_sells_token0() {
        let mut strategy =
            ArbitrageStrategy::new(config_with_refs(vec![static_ref("oracle", dec!(96))]));
        let decision = strategy
            .should_trade(&market(dec!(100)), &TradingLimits::default())
            .await;

        assert!(decision.should_trade);
        assert_eq!(decision.direction, Some(SwapDirection::ZeroForOne));
    }

    #[tokio::test]
    async fn spread_outside_band_is_ignored() {
        // 0.5% is below the 1% floor; 20% is above the 10% cap
        let mut strategy = ArbitrageStrategy::new(config_with_refs(vec![
            static_ref("tight", dec!(100.5)),
            static_ref("wild", dec!(120)),
        ]));
        let decision = strategy
            .should_trade(&market(dec!(100)), &TradingLimits::default())
            .await;
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("no arbitrage opportunity"));
    }

    #[tokio::test]
    async fn widest_weighted_spread_wins() {
        let mut config = config_with_refs(vec![
            static_ref("narrow", dec!(102)),
            static_ref("wide", dec!(95)),
        ]);
        config.source_weights.insert("wide".to_string(), 1.0);
        let mut strategy = ArbitrageStrategy::new(config);

        let decision = strategy
            .should_trade(&market(dec!(100)), &TradingLimits::default())
            .await;
        assert!(decision.should_trade);
        assert!(decision.reasoning.contains("wide"));
        assert_eq!(decision.direction, Some(SwapDirection::ZeroForOne));
    }

    #[tokio::test]
    async fn gas_and_margin_gate_rejects_thin_profit() {
        let mut config = config_with_refs(vec![static_ref("oracle", dec!(102))]);
        config.estimated_gas_cost = U256::from(10u64).pow(U256::from(30u64));
        let mut strategy = ArbitrageStrategy::new(config);

        let decision = strategy
            .should_trade(&market(dec!(100)), &TradingLimits::default())
            .await;
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("below gas"));
    }

    #[tokio::test]
    async fn injected_prices_participate_and_expire() {
        let m = market(dec!(100));
        let mut strategy = ArbitrageStrategy::new(config_with_refs(vec![]));
        strategy.update_reference_price(m.pool_id, "feed", dec!(104));

        let decision = strategy.should_trade(&m, &TradingLimits::default()).await;
        assert!(decision.should_trade);
        assert!(decision.reasoning.contains("feed"));

        // A stale injected entry is discarded
        let mut strategy = ArbitrageStrategy::new(config_with_refs(vec![]));
        strategy.update_reference_price(m.pool_id, "feed", dec!(104));
        if let Some(refs) = strategy.injected.get_mut(&m.pool_id) {
            refs[0].timestamp = Some(Utc::now() - Duration::seconds(REFERENCE_MAX_AGE_SECS + 10));
        }
        let decision = strategy.should_trade(&m, &TradingLimits::default()).await;
        assert!(!decision.should_trade);
    }

    #[tokio::test]
    async fn cross_pool_references_only_when_enabled() {
        let m = market(dec!(100));
        let other_pool = B256::repeat_byte(0x99);

        let mut strategy = ArbitrageStrategy::new(config_with_refs(vec![]));
        strategy.update_reference_price(other_pool, "feed", dec!(104));
        let decision = strategy.should_trade(&m, &TradingLimits::default()).await;
        assert!(!decision.should_trade);

        let mut config = config_with_refs(vec![]);
        config.enable_cross_pool = true;
        let mut strategy = ArbitrageStrategy::new(config);
        strategy.update_reference_price(other_pool, "feed", dec!(104));
        let decision = strategy.should_trade(&m, &TradingLimits::default()).await;
        assert!(decision.should_trade);
    }

    #[tokio::test]
    async fn liquidity_floor_blocks_thin_pools() {
        let mut config = config_with_refs(vec![static_ref("oracle", dec!(103))]);
        config.min_liquidity = U256::from(10_000_000u64);
        let mut strategy = ArbitrageStrategy::new(config);

        let decision = strategy
            .should_trade(&market(dec!(100)), &TradingLimits::default())
            .await;
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("liquidity"));
    }
}
