//! Trading agent
//!
//! One agent owns one strategy instance. On each market snapshot it asks
//! the strategy for a decision; a trade becomes a swap intent, a hashed
//! commitment on chain, a buffered reveal, and a readiness signal to the
//! coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{B256, U256};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coordinator::{AgentReadinessSignal, BatchCoordinator};
use crate::domain::{MarketData, ProofGenerator, SwapDirection, SwapIntent};
use crate::error::Result;
use crate::executor::BatchExecutor;
use crate::hook::HookApi;
use crate::reveal::RevealManager;
use crate::signing::{NonceAllocator, Wallet};
use crate::strategy::{Strategy, TradingLimits};

/// Commit-phase tuning from the agent config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentSettings {
    /// Intent deadline relative to now, in seconds
    pub default_deadline_offset_s: u64,
    /// Floor the hook enforces; mirrored for readiness checks
    pub min_commitments: u32,
    /// Target batch cadence, advisory
    pub batch_interval_s: u64,
}

impl Default for CommitmentSettings {
    fn default() -> Self {
        Self {
            default_deadline_offset_s: 600,
            min_commitments: 2,
            batch_interval_s: 60,
        }
    }
}

/// One autonomous trading agent
pub struct TradingAgent {
    id: String,
    wallet: Arc<Wallet>,
    strategy: Box<dyn Strategy>,
    hook: Arc<dyn HookApi>,
    reveals: Arc<RevealManager>,
    coordinator: BatchCoordinator,
    executor: BatchExecutor,
    proof_generator: Option<Arc<dyn ProofGenerator>>,
    nonces: Arc<NonceAllocator>,
    limits: TradingLimits,
    commitment: CommitmentSettings,
    /// Commitments this agent has made and not yet seen executed, per pool
    pending: HashMap<B256, u32>,
}

impl TradingAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        wallet: Arc<Wallet>,
        strategy: Box<dyn Strategy>,
        hook: Arc<dyn HookApi>,
        reveals: Arc<RevealManager>,
        coordinator: BatchCoordinator,
        executor: BatchExecutor,
        limits: TradingLimits,
        commitment: CommitmentSettings,
    ) -> Self {
        Self {
            id: id.into(),
            wallet,
            strategy,
            hook,
            reveals,
            coordinator,
            executor,
            proof_generator: None,
            nonces: Arc::new(NonceAllocator::new()),
            limits,
            commitment,
            pending: HashMap::new(),
        }
    }

    /// Enable ZK mode: commitments carry proofs and reveals go through the
    /// proof-verified path
    pub fn with_proof_generator(mut self, generator: Arc<dyn ProofGenerator>) -> Self {
        self.proof_generator = Some(generator);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn pending_commitments(&self, pool_id: B256) -> u32 {
        self.pending.get(&pool_id).copied().unwrap_or(0)
    }

    /// Process one market snapshot end to end
    pub async fn on_market_data(&mut self, market: &MarketData) -> Result<()> {
        // One tracking id per evaluation; a committed intent carries it
        let intent_id = Uuid::new_v4();
        let decision = self.strategy.should_trade(market, &self.limits).await;

        if !decision.should_trade {
            debug!(
                agent_id = %self.id,
                %intent_id,
                pool_id = %market.pool_id,
                reason = %decision.reasoning,
                "no trade"
            );
            // Keep the coordinator's view of earlier commitments alive
            if self.pending_commitments(market.pool_id) > 0 {
                self.signal_readiness(market.pool_id).await?;
            }
            return Ok(());
        }

        let Some(direction) = decision.direction else {
            warn!(agent_id = %self.id, %intent_id, "trade decision without direction, ignoring");
            return Ok(());
        };

        let intent = self
            .build_intent(
                intent_id,
                market,
                direction,
                decision.amount_in,
                decision.min_amount_out,
            )
            .await;
        let hash = intent.commitment_hash();

        info!(
            agent_id = %self.id,
            intent_id = %intent.intent_id,
            pool_id = %market.pool_id,
            commitment = %hash,
            %direction,
            amount_in = %intent.amount_in,
            confidence = decision.confidence,
            reason = %decision.reasoning,
            "committing intent"
        );

        match &self.proof_generator {
            Some(generator) => {
                let proof = generator.generate_proof(&intent, hash).await?;
                self.hook
                    .submit_commitment_with_proof(&market.pool_key, hash, &proof)
                    .await?;
                self.executor.store_proof(hash, proof).await;
                self.reveals
                    .add_reveal(hash, intent, market.pool_key, market.pool_id, true)
                    .await;
            }
            None => {
                self.hook
                    .submit_commitment(&market.pool_key, hash)
                    .await?;
                self.reveals
                    .add_reveal(hash, intent, market.pool_key, market.pool_id, false)
                    .await;
            }
        }

        *self.pending.entry(market.pool_id).or_insert(0) += 1;
        self.signal_readiness(market.pool_id).await
    }

    async fn build_intent(
        &self,
        intent_id: Uuid,
        market: &MarketData,
        direction: SwapDirection,
        amount_in: U256,
        min_amount_out: U256,
    ) -> SwapIntent {
        let (token_in, token_out) = match direction {
            SwapDirection::ZeroForOne => (market.pool_key.currency0, market.pool_key.currency1),
            SwapDirection::OneForZero => (market.pool_key.currency1, market.pool_key.currency0),
        };
        let deadline = Utc::now().timestamp().max(0) as u64 + self.commitment.default_deadline_offset_s;

        SwapIntent {
            intent_id,
            user: self.wallet.address(),
            token_in,
            token_out,
            amount_in,
            min_amount_out,
            recipient: self.wallet.address(),
            nonce: self.nonces.allocate(market.pool_id).await,
            deadline: U256::from(deadline),
        }
    }

    async fn signal_readiness(&self, pool_id: B256) -> Result<()> {
        let signal = AgentReadinessSignal {
            agent_id: self.id.clone(),
            pool_id,
            ready: true,
            pending_commitments: self.pending_commitments(pool_id),
            preferred_slippage_bps: Some(self.limits.default_slippage_bps),
            timestamp: Utc::now(),
        };
        self.coordinator.signal_ready(signal).await
    }

    /// Called after the pool's batch executed; clears the local pending
    /// count
    pub fn handle_batch_executed(&mut self, pool_id: B256) {
        self.pending.remove(&pool_id);
    }

    /// Withdraw readiness and drop state for one pool
    pub async fn abandon_pool(&mut self, pool_id: B256) -> Result<()> {
        self.pending.remove(&pool_id);
        self.coordinator.withdraw_ready(&self.id, pool_id).await
    }
}
