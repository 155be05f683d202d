//! Market data fetching with a per-pool TTL cache
//!
//! The ingestion layer behind [`MarketDataSource`] is a collaborator; this
//! module owns caching and volume arithmetic only. Stale entries are
//! discarded on read and the source is hit again.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{B256, U256};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{MarketData, PoolKey, RecentSwap};
use crate::error::Result;

/// Source of market snapshots (indexer, subgraph, simulation, ...)
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_market_data(&self, pool_key: &PoolKey) -> Result<MarketData>;
}

/// Sum of |amount0| + |amount1| across swaps within the trailing window
pub fn calculate_volume(swaps: &[RecentSwap], window_s: i64) -> U256 {
    let cutoff = Utc::now() - Duration::seconds(window_s);
    swaps
        .iter()
        .filter(|s| s.timestamp >= cutoff)
        .fold(U256::ZERO, |acc, s| {
            acc.saturating_add(s.amount0.unsigned_abs())
                .saturating_add(s.amount1.unsigned_abs())
        })
}

/// TTL cache over a [`MarketDataSource`]
pub struct MarketDataFetcher {
    source: Arc<dyn MarketDataSource>,
    ttl: Duration,
    cache: RwLock<HashMap<B256, MarketData>>,
}

impl MarketDataFetcher {
    pub fn new(source: Arc<dyn MarketDataSource>, ttl_s: i64) -> Self {
        Self {
            source,
            ttl: Duration::seconds(ttl_s),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached snapshot when fresh, otherwise a fetch that refills the
    /// cache
    pub async fn fetch_market_data(&self, pool_key: &PoolKey) -> Result<MarketData> {
        let pool_id = pool_key.pool_id();

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&pool_id) {
                if entry.age() <= self.ttl {
                    return Ok(entry.clone());
                }
            }
        }

        // Entry missing or expired: evict and refetch
        debug!(%pool_id, "market cache miss, fetching");
        let fresh = self.source.fetch_market_data(pool_key).await?;
        let mut cache = self.cache.write().await;
        cache.insert(pool_id, fresh.clone());
        Ok(fresh)
    }

    pub async fn clear_cache(&self, pool_id: B256) {
        self.cache.write().await.remove(&pool_id);
    }

    pub async fn clear_all_cache(&self) {
        self.cache.write().await.clear();
    }
}
