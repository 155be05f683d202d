//! Agent manager — wires agents, coordinator, and executor together
//!
//! The main `run()` loop uses `tokio::select!` to:
//!   - Feed market snapshots to every agent
//!   - Drive batch execution when the coordinator fires a pool
//!   - Tear everything down on the shutdown signal

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::agent::agent::TradingAgent;
use crate::coordinator::{BatchCoordinator, BatchReadyEvent};
use crate::domain::MarketData;
use crate::executor::BatchExecutor;

/// Owns the per-process agent set and the coordination event loop
pub struct AgentManager {
    coordinator: BatchCoordinator,
    executor: BatchExecutor,
    agents: Vec<Arc<Mutex<TradingAgent>>>,
    event_rx: mpsc::Receiver<BatchReadyEvent>,
    market_rx: mpsc::Receiver<MarketData>,
}

impl AgentManager {
    pub fn new(
        coordinator: BatchCoordinator,
        executor: BatchExecutor,
        event_rx: mpsc::Receiver<BatchReadyEvent>,
        market_rx: mpsc::Receiver<MarketData>,
    ) -> Self {
        Self {
            coordinator,
            executor,
            agents: Vec::new(),
            event_rx,
            market_rx,
        }
    }

    /// Register an agent with the coordinator and take ownership of it
    pub async fn add_agent(&mut self, agent: TradingAgent) {
        self.coordinator.register_agent(agent.id()).await;
        info!(agent_id = %agent.id(), strategy = agent.strategy_name(), "agent added");
        self.agents.push(Arc::new(Mutex::new(agent)));
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Main loop — blocks until shutdown
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(agents = self.agents.len(), "agent manager starting main loop");
        self.executor.start_polling().await;

        loop {
            tokio::select! {
                // --- Coordinator fired a pool ---
                Some(event) = self.event_rx.recv() => {
                    self.handle_batch_ready(event).await;
                }

                // --- Fresh market snapshot ---
                Some(market) = self.market_rx.recv() => {
                    self.dispatch_market(market).await;
                }

                // --- Shutdown signal ---
                _ = shutdown_rx.recv() => {
                    info!("agent manager: shutdown signal received");
                    break;
                }
            }
        }

        self.executor.stop_polling().await;
        self.coordinator.destroy().await;
        info!("agent manager: main loop exited");
    }

    async fn handle_batch_ready(&self, event: BatchReadyEvent) {
        info!(
            pool_id = %event.pool_id,
            agents = event.params.participating_agents.len(),
            total_commitments = event.params.total_commitments,
            slippage_bps = event.params.slippage_bps,
            "batch window fired, executing"
        );

        let result = self.executor.execute(event.pool_id).await;
        if result.success {
            for agent in &self.agents {
                agent.lock().await.handle_batch_executed(event.pool_id);
            }
            info!(
                pool_id = %event.pool_id,
                tx_hash = ?result.tx_hash,
                batch_size = result.batch_size,
                "batch settled"
            );
        } else {
            error!(
                pool_id = %event.pool_id,
                error = ?result.error,
                "batch execution failed"
            );
        }
    }

    async fn dispatch_market(&self, market: MarketData) {
        debug!(pool_id = %market.pool_id, price = %market.current_price, "market snapshot");
        for agent in &self.agents {
            let mut agent = agent.lock().await;
            if let Err(e) = agent.on_market_data(&market).await {
                warn!(agent_id = %agent.id(), error = %e, "agent failed to process snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::agent::CommitmentSettings;
    use crate::coordinator::CoordinatorConfig;
    use crate::domain::PoolKey;
    use crate::executor::ExecutorConfig;
    use crate::hook::MockHook;
    use crate::reveal::RevealManager;
    use crate::signing::Wallet;
    use crate::strategy::{build_strategy, StrategyKind, StrategySettings, TradingLimits};
    use alloy::primitives::{Address, U256};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn pool_key() -> PoolKey {
        PoolKey::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            3000,
            60,
            Address::repeat_byte(3),
        )
    }

    fn trending_market() -> MarketData {
        let key = pool_key();
        MarketData {
            pool_id: key.pool_id(),
            pool_key: key,
            current_price: dec!(1.5),
            price_change_1h: 3.0,
            price_change_24h: 8.0,
            total_liquidity: U256::from(1_000_000u64),
            liquidity0: U256::from(500_000u64),
            liquidity1: U256::from(500_000u64),
            volume_1h: U256::from(500u64),
            volume_24h: U256::from(5_000u64),
            recent_swaps: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn end_to_end_commit_fire_execute() {
        let hook = Arc::new(MockHook::new());
        let reveals = Arc::new(RevealManager::new(hook.clone()));
        let (coordinator, event_rx) = BatchCoordinator::new(CoordinatorConfig {
            quorum: 2,
            min_total_commitments: 2,
            countdown_ms: 10_000,
            ..Default::default()
        });
        let executor = BatchExecutor::new(
            hook.clone(),
            reveals.clone(),
            ExecutorConfig {
                poll_interval_ms: 60_000,
                post_reveal_delay_ms: 0,
                max_retries: 0,
                retry_base_delay_ms: 1,
                zk_mode: false,
            },
        );
        executor.add_pool(pool_key()).await;

        let (market_tx, market_rx) = mpsc::channel(16);
        let mut manager = AgentManager::new(coordinator.clone(), executor.clone(), event_rx, market_rx);

        for id in ["agent-1", "agent-2"] {
            let agent = TradingAgent::new(
                id,
                Arc::new(Wallet::ephemeral(1)),
                build_strategy(StrategyKind::Momentum, &StrategySettings::default()),
                hook.clone(),
                reveals.clone(),
                coordinator.clone(),
                executor.clone(),
                TradingLimits::default(),
                CommitmentSettings::default(),
            );
            manager.add_agent(agent).await;
        }
        assert_eq!(manager.agent_count(), 2);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(manager.run(shutdown_rx));

        // Both agents commit on the same snapshot; with every registered
        // agent ready the pool fires immediately and the batch settles
        market_tx.send(trending_market()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(hook.call_count("submit_commitment"), 2);
        assert_eq!(hook.executed_batches().len(), 1);
        assert_eq!(hook.executed_batches()[0].len(), 2);
        assert!(reveals
            .get_submitted_hashes_for_pool(pool_key().pool_id())
            .await
            .is_empty());

        shutdown_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    }
}
