//! Mean-reversion strategy
//!
//! Maintains an EMA of price and price-squared per pool, derives a
//! z-score against the EMA standard deviation, and trades against the
//! deviation. A z-score beyond the regime threshold is read as the mean
//! itself having moved, so no contrarian entry is taken.

use std::collections::{HashMap, VecDeque};

use alloy::primitives::B256;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{MarketData, SwapDirection, TradeDecision};
use crate::strategy::toolkit::{
    clamp_amount, min_amount_out, scale_amount, validate_market_data, CooldownTracker,
    TradingLimits,
};
use crate::strategy::traits::Strategy;

/// Ring-buffer capacity for per-pool price history
const PRICE_HISTORY_CAP: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    pub ema_period: usize,
    /// Overrides the default `2 / (ema_period + 1)` smoothing
    #[serde(default)]
    pub ema_smoothing_factor: Option<f64>,
    pub moderate_dev_threshold: f64,
    pub strong_dev_threshold: f64,
    pub extreme_dev_threshold: f64,
    /// Beyond this z-score the mean is assumed to have shifted
    pub max_dev_threshold: f64,
    pub cooldown_s: u64,
    pub min_confidence: f64,
    pub require_volume_confirmation: bool,
    /// 1h volume over total liquidity that confirms the move
    pub volume_confirmation_ratio: f64,
    pub min_data_points: usize,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            ema_period: 20,
            ema_smoothing_factor: None,
            moderate_dev_threshold: 1.0,
            strong_dev_threshold: 2.0,
            extreme_dev_threshold: 3.0,
            max_dev_threshold: 4.0,
            cooldown_s: 300,
            min_confidence: 0.3,
            require_volume_confirmation: false,
            volume_confirmation_ratio: 0.3,
            min_data_points: 10,
        }
    }
}

/// Rolling statistics for one pool
#[derive(Debug, Clone, Default)]
struct PoolStats {
    history: VecDeque<(f64, DateTime<Utc>)>,
    ema: f64,
    ema_sq: f64,
    initialized: bool,
}

impl PoolStats {
    fn observe(&mut self, price: f64, at: DateTime<Utc>, smoothing: f64) {
        if self.history.len() == PRICE_HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back((price, at));

        if !self.initialized {
            self.ema = price;
            self.ema_sq = price * price;
            self.initialized = true;
        } else {
            self.ema = price * smoothing + self.ema * (1.0 - smoothing);
            self.ema_sq = price * price * smoothing + self.ema_sq * (1.0 - smoothing);
        }
    }

    fn sigma(&self) -> f64 {
        (self.ema_sq - self.ema * self.ema).max(0.0).sqrt()
    }
}

pub struct MeanReversionStrategy {
    config: MeanReversionConfig,
    cooldowns: CooldownTracker,
    stats: HashMap<B256, PoolStats>,
}

impl MeanReversionStrategy {
    pub fn new(config: MeanReversionConfig) -> Self {
        Self {
            config,
            cooldowns: CooldownTracker::new(),
            stats: HashMap::new(),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::seconds(self.config.cooldown_s as i64)
    }

    fn smoothing(&self) -> f64 {
        self.config
            .ema_smoothing_factor
            .unwrap_or(2.0 / (self.config.ema_period as f64 + 1.0))
    }

    /// Data points accumulated for a pool (test and monitoring hook)
    pub fn data_points(&self, pool_id: B256) -> usize {
        self.stats.get(&pool_id).map(|s| s.history.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &'static str {
        "mean_reversion"
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

        let Some(price) = market.current_price.to_f64() else {
            return TradeDecision::no_trade("price not representable".to_string());
        };

        // Statistics update happens on every snapshot, trade or not
        let smoothing = self.smoothing();
        let stats = self.stats.entry(market.pool_id).or_default();
        stats.observe(price, market.captured_at, smoothing);
        let ema = stats.ema;
        let sigma = stats.sigma();
        let data_points = stats.history.len();

        if self.cooldowns.is_active(market.pool_id, self.cooldown()) {
            return TradeDecision::no_trade(format!(
                "cooldown active for pool {}",
                market.pool_id
            ));
        }

        if sigma == 0.0 {
            return TradeDecision::no_trade("no price dispersion yet".to_string());
        }

        let z = (price - ema) / sigma;
        let deviation_pct = if ema != 0.0 {
            (price - ema) / ema * 100.0
        } else {
            0.0
        };

        if z.abs() > self.config.max_dev_threshold {
            return TradeDecision::no_trade(format!(
                "regime change suspected: |z|={:.2} beyond {:.2}",
                z.abs(),
                self.config.max_dev_threshold
            ));
        }

        let mut confidence: f64 = if z.abs() >= self.config.extreme_dev_threshold {
            0.9
        } else if z.abs() >= self.config.strong_dev_threshold {
            0.65
        } else if z.abs() >= self.config.moderate_dev_threshold {
            0.4
        } else {
            return TradeDecision::no_trade(format!(
                "z-score {:.2} within normal range",
                z
            ));
        };

        if self.config.require_volume_confirmation {
            let total = market.total_liquidity.to_string().parse::<f64>().unwrap_or(0.0);
            let volume = market.volume_1h.to_string().parse::<f64>().unwrap_or(0.0);
            let ratio = if total > 0.0 { volume / total } else { 0.0 };
            if ratio >= self.config.volume_confirmation_ratio {
                confidence = (confidence * 1.2).min(1.0);
            } else {
                confidence *= 0.7;
            }
        }

        if data_points < self.config.min_data_points {
            return TradeDecision::no_trade(format!(
                "only {data_points} data points, need {}",
                self.config.min_data_points
            ));
        }

        if confidence < self.config.min_confidence {
            return TradeDecision::no_trade(format!(
                "confidence {confidence:.2} below floor {:.2}",
                self.config.min_confidence
            ));
        }

        // Contrarian: above the mean sells token0, below it buys
        let direction = if z > 0.0 {
            SwapDirection::ZeroForOne
        } else {
            SwapDirection::OneForZero
        };

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
            z,
            deviation_pct,
            confidence,
            %direction,
            "mean-reversion entry"
        );

        TradeDecision::trade(
            direction,
            amount_in,
            min_out,
            confidence,
            format!(
                "z-score {z:.2} ({deviation_pct:+.2}% vs EMA), confidence {confidence:.2}"
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
        self.stats.clear();
    }
}
