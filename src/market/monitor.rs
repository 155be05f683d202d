//! Pool monitor
//!
//! Periodically refreshes every registered pool through the fetcher and
//! forwards fresh snapshots to the agent runtime over a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::{MarketData, PoolKey};
use crate::market::fetcher::MarketDataFetcher;

/// Periodic market refresher for a set of pools
pub struct PoolMonitor {
    fetcher: Arc<MarketDataFetcher>,
    interval: Duration,
    pools: Arc<RwLock<Vec<PoolKey>>>,
    tx: mpsc::Sender<MarketData>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PoolMonitor {
    pub fn new(
        fetcher: Arc<MarketDataFetcher>,
        interval_ms: u64,
    ) -> (Self, mpsc::Receiver<MarketData>) {
        let (tx, rx) = mpsc::channel(128);
        let monitor = Self {
            fetcher,
            interval: Duration::from_millis(interval_ms),
            pools: Arc::new(RwLock::new(Vec::new())),
            tx,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        };
        (monitor, rx)
    }

    pub async fn add_pool(&self, pool_key: PoolKey) {
        let mut pools = self.pools.write().await;
        if !pools.contains(&pool_key) {
            pools.push(pool_key);
        }
    }

    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let fetcher = self.fetcher.clone();
        let pools = self.pools.clone();
        let tx = self.tx.clone();
        let running = self.running.clone();
        let interval = self.interval;
        info!(interval_ms = interval.as_millis() as u64, "pool monitor started");

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let snapshot_pools: Vec<PoolKey> = pools.read().await.clone();
                for pool_key in snapshot_pools {
                    match fetcher.fetch_market_data(&pool_key).await {
                        Ok(market) => {
                            if tx.send(market).await.is_err() {
                                warn!("market consumer dropped, stopping monitor");
                                running.store(false, Ordering::SeqCst);
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(pool = %pool_key, error = %e, "market refresh failed");
                        }
                    }
                }
            }
        });

        *self.handle.lock().await = Some(handle);
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
        info!("pool monitor stopped");
    }
}
