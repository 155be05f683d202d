//! Market data snapshots
//!
//! Snapshots are immutable value types; nothing mutates them after
//! construction. Staleness is judged against `captured_at`.

use alloy::primitives::{B256, I256, U256};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::PoolKey;

/// Snapshots older than this are considered stale
pub const MARKET_DATA_MAX_AGE_SECS: i64 = 300;

/// One recent swap observed on the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSwap {
    pub amount0: I256,
    pub amount1: I256,
    pub zero_for_one: bool,
    pub timestamp: DateTime<Utc>,
}

/// A point-in-time view of one pool's market state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    pub pool_id: B256,
    pub pool_key: PoolKey,
    pub current_price: Decimal,
    /// Percent change over the trailing hour
    pub price_change_1h: f64,
    /// Percent change over the trailing day
    pub price_change_24h: f64,
    pub total_liquidity: U256,
    pub liquidity0: U256,
    pub liquidity1: U256,
    pub volume_1h: U256,
    pub volume_24h: U256,
    pub recent_swaps: Vec<RecentSwap>,
    pub captured_at: DateTime<Utc>,
}

impl MarketData {
    pub fn age(&self) -> Duration {
        Utc::now() - self.captured_at
    }

    pub fn is_stale(&self) -> bool {
        self.age() > Duration::seconds(MARKET_DATA_MAX_AGE_SECS)
    }
}
