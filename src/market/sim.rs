//! Deterministic simulated market source
//!
//! Drives the agent stack without an ingestion backend: price follows a
//! slow deterministic oscillation per pool, liquidity and volume are
//! derived from it. Used by dry-run mode and tests.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{I256, U256};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::domain::{MarketData, PoolKey, RecentSwap};
use crate::error::Result;
use crate::market::fetcher::MarketDataSource;

/// Oscillating price source; each fetch advances one tick
pub struct SimulatedMarketSource {
    base_price: f64,
    /// Peak-to-mean amplitude as a fraction of the base price
    amplitude: f64,
    /// Ticks per full oscillation
    period: f64,
    tick: AtomicU64,
}

impl Default for SimulatedMarketSource {
    fn default() -> Self {
        Self::new(1.0, 0.05, 40.0)
    }
}

impl SimulatedMarketSource {
    pub fn new(base_price: f64, amplitude: f64, period: f64) -> Self {
        Self {
            base_price,
            amplitude,
            period: period.max(1.0),
            tick: AtomicU64::new(0),
        }
    }

    fn price_at(&self, tick: u64, phase: f64) -> f64 {
        let angle = (tick as f64 / self.period) * std::f64::consts::TAU + phase;
        self.base_price * (1.0 + self.amplitude * angle.sin())
    }
}

#[async_trait]
impl MarketDataSource for SimulatedMarketSource {
    async fn fetch_market_data(&self, pool_key: &PoolKey) -> Result<MarketData> {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        // Offset the wave per pool so pools do not move in lockstep
        let phase = pool_key.pool_id().as_slice()[0] as f64 / 255.0 * std::f64::consts::TAU;

        let price = self.price_at(tick, phase);
        let hour_ago = self.price_at(tick.saturating_sub(12), phase);
        let day_ago = self.price_at(tick.saturating_sub(288), phase);
        let change_1h = (price - hour_ago) / hour_ago * 100.0;
        let change_24h = (price - day_ago) / day_ago * 100.0;

        // Liquidity leans toward the cheap side as the price swings
        let total = 2_000_000u64;
        let skew = (0.5 + self.amplitude * ((tick as f64 / self.period).sin()) / 2.0)
            .clamp(0.2, 0.8);
        let liquidity0 = (total as f64 * skew) as u64;
        let liquidity1 = total - liquidity0;

        let swap_flow = price > hour_ago;
        let recent_swaps = (0..5)
            .map(|i| RecentSwap {
                amount0: I256::try_from(10_000 + i as i64 * 500).unwrap_or(I256::ZERO),
                amount1: I256::try_from(-(9_000 + i as i64 * 400)).unwrap_or(I256::ZERO),
                zero_for_one: !swap_flow,
                timestamp: Utc::now() - chrono::Duration::seconds(i * 30),
            })
            .collect();

        Ok(MarketData {
            pool_id: pool_key.pool_id(),
            pool_key: *pool_key,
            current_price: Decimal::from_f64(price).unwrap_or(Decimal::ONE),
            price_change_1h: change_1h,
            price_change_24h: change_24h,
            total_liquidity: U256::from(total),
            liquidity0: U256::from(liquidity0),
            liquidity1: U256::from(liquidity1),
            volume_1h: U256::from(50_000u64 + tick * 100),
            volume_24h: U256::from(1_200_000u64 + tick * 2_400),
            recent_swaps,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[tokio::test]
    async fn prices_oscillate_and_stay_positive() {
        let source = SimulatedMarketSource::default();
        let key = PoolKey::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            3000,
            60,
            Address::repeat_byte(3),
        );

        let mut prices = Vec::new();
        for _ in 0..50 {
            let market = source.fetch_market_data(&key).await.unwrap();
            assert!(market.current_price > Decimal::ZERO);
            assert_eq!(
                market.total_liquidity,
                market.liquidity0 + market.liquidity1
            );
            prices.push(market.current_price);
        }
        let distinct: std::collections::HashSet<_> = prices.iter().collect();
        assert!(distinct.len() > 10, "price path should move");
    }
}
