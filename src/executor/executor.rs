//! Batch executor
//!
//! Decides when a pool's buffered state warrants an on-chain batch execute
//! and sequences the reveal-submission → execution steps. The ordering
//! contract is strict: reveals are submitted first, the batch refuses to
//! run without submitted reveals (and, in ZK mode, without a proof for
//! every hash), and only one execution per pool is ever in flight.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{CommitmentHash, PoolKey, ZkProof};
use crate::error::{Result, UmbraError};
use crate::executor::history::{ExecutionRecord, ExecutionStats};
use crate::hook::HookApi;
use crate::reveal::RevealManager;

/// Executor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub poll_interval_ms: u64,
    /// Pause after reveal submission to allow chain propagation
    pub post_reveal_delay_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Execute with proofs instead of plain reveals
    #[serde(default)]
    pub zk_mode: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            post_reveal_delay_ms: 2_000,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            zk_mode: false,
        }
    }
}

/// Combined readiness view for one pool
#[derive(Debug, Clone)]
pub struct BatchReadiness {
    pub can_exec: bool,
    pub pending_on_chain: u32,
    /// Reveals already submitted on chain and awaiting execution
    pub reveals_ready: usize,
    pub meets_minimum: bool,
    pub ready: bool,
}

/// Terminal outcome of one batch-execute call
#[derive(Debug, Clone)]
pub struct BatchExecution {
    pub pool_id: B256,
    pub success: bool,
    pub tx_hash: Option<B256>,
    pub batch_size: usize,
    pub error: Option<String>,
}

impl BatchExecution {
    fn failure(pool_id: B256, batch_size: usize, error: impl Into<String>) -> Self {
        Self {
            pool_id,
            success: false,
            tx_hash: None,
            batch_size,
            error: Some(error.into()),
        }
    }
}

#[derive(Default)]
struct ExecutorState {
    pools: HashMap<B256, PoolKey>,
    in_flight: HashSet<B256>,
    proofs: HashMap<CommitmentHash, ZkProof>,
    history: Vec<ExecutionRecord>,
}

/// Drives batch execution for a set of monitored pools. Clone-friendly:
/// clones share state.
#[derive(Clone)]
pub struct BatchExecutor {
    hook: Arc<dyn HookApi>,
    reveals: Arc<RevealManager>,
    config: ExecutorConfig,
    state: Arc<RwLock<ExecutorState>>,
    running: Arc<AtomicBool>,
    poll_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BatchExecutor {
    pub fn new(hook: Arc<dyn HookApi>, reveals: Arc<RevealManager>, config: ExecutorConfig) -> Self {
        Self {
            hook,
            reveals,
            config,
            state: Arc::new(RwLock::new(ExecutorState::default())),
            running: Arc::new(AtomicBool::new(false)),
            poll_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a pool for monitoring and execution
    pub async fn add_pool(&self, pool_key: PoolKey) {
        let pool_id = pool_key.pool_id();
        self.state.write().await.pools.insert(pool_id, pool_key);
        debug!(%pool_id, "pool added to executor");
    }

    pub async fn remove_pool(&self, pool_id: B256) {
        self.state.write().await.pools.remove(&pool_id);
        debug!(%pool_id, "pool removed from executor");
    }

    /// Cache a proof for a commitment. Proofs are not persisted across
    /// restarts; the caller repopulates when needed.
    pub async fn store_proof(&self, hash: CommitmentHash, proof: ZkProof) {
        self.state.write().await.proofs.insert(hash, proof);
    }

    pub async fn get_proof(&self, hash: CommitmentHash) -> Option<ZkProof> {
        self.state.read().await.proofs.get(&hash).cloned()
    }

    /// Query the hook and the reveal buffer for one pool's readiness
    pub async fn check_batch_readiness(&self, pool_id: B256) -> Result<BatchReadiness> {
        let check = self.hook.checker(pool_id).await?;
        let pending_on_chain = self.hook.get_pending_commitment_count(pool_id).await?;
        let reveals_ready = self.reveals.get_submitted_hashes_for_pool(pool_id).await.len();
        let min_commitments = self.hook.get_min_commitments().await?;
        let meets_minimum = reveals_ready >= min_commitments as usize;

        Ok(BatchReadiness {
            can_exec: check.can_exec,
            pending_on_chain,
            reveals_ready,
            meets_minimum,
            ready: check.can_exec && meets_minimum,
        })
    }

    /// Submit pending reveals and run the standard batch execute
    pub async fn execute_batch(&self, pool_id: B256) -> BatchExecution {
        self.execute_internal(pool_id, false).await
    }

    /// Submit pending reveals and run the proof-carrying batch execute
    pub async fn execute_batch_zk(&self, pool_id: B256) -> BatchExecution {
        self.execute_internal(pool_id, true).await
    }

    /// Execute using the configured mode
    pub async fn execute(&self, pool_id: B256) -> BatchExecution {
        self.execute_internal(pool_id, self.config.zk_mode).await
    }

    async fn execute_internal(&self, pool_id: B256, zk: bool) -> BatchExecution {
        let pool_key = {
            let mut state = self.state.write().await;
            let Some(key) = state.pools.get(&pool_id).copied() else {
                return BatchExecution::failure(pool_id, 0, "pool not registered with executor");
            };
            if !state.in_flight.insert(pool_id) {
                debug!(%pool_id, "batch execution already in flight, skipping");
                return BatchExecution::failure(
                    pool_id,
                    0,
                    UmbraError::ExecutionInFlight(pool_id).to_string(),
                );
            }
            key
        };

        let result = self.run_batch(pool_key, pool_id, zk).await;
        self.state.write().await.in_flight.remove(&pool_id);
        result
    }

    async fn run_batch(&self, pool_key: PoolKey, pool_id: B256, zk: bool) -> BatchExecution {
        // Step 1: push pending reveals on chain first
        let submissions = self.reveals.submit_all_reveals().await;
        if !submissions.is_empty() {
            debug!(
                %pool_id,
                submitted = submissions.iter().filter(|s| s.success).count(),
                failed = submissions.iter().filter(|s| !s.success).count(),
                "reveal submission pass finished"
            );
        }

        let hashes = self.reveals.get_submitted_hashes_for_pool(pool_id).await;
        if hashes.is_empty() {
            let err = UmbraError::NoSubmittedReveals(pool_id);
            warn!(%pool_id, "{err}");
            return BatchExecution::failure(pool_id, 0, err.to_string());
        }

        // Step 2 (ZK): every hash needs a stored proof before any execute
        // call is attempted
        let proofs = if zk {
            let state = self.state.read().await;
            let mut proofs = Vec::with_capacity(hashes.len());
            for hash in &hashes {
                match state.proofs.get(hash) {
                    Some(proof) => proofs.push(proof.clone()),
                    None => {
                        let err = UmbraError::MissingZkProof(*hash);
                        warn!(%pool_id, %hash, "{err}");
                        return BatchExecution::failure(pool_id, hashes.len(), err.to_string());
                    }
                }
            }
            Some(proofs)
        } else {
            None
        };

        // Step 3: give the chain time to see the reveals
        if self.config.post_reveal_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.post_reveal_delay_ms)).await;
        }

        // Steps 4-6: execute with retry/backoff
        let batch_size = hashes.len();
        let mut attempt: u32 = 0;
        loop {
            let outcome = match &proofs {
                Some(proofs) => {
                    self.hook
                        .reveal_and_batch_execute_with_proofs(&pool_key, &hashes, proofs)
                        .await
                }
                None => self.hook.reveal_and_batch_execute(&pool_key, &hashes).await,
            };

            match outcome {
                Ok(tx) => {
                    info!(
                        %pool_id,
                        tx_hash = %tx.tx_hash,
                        batch_size,
                        gas_used = ?tx.gas_used,
                        "batch executed"
                    );
                    self.record(ExecutionRecord {
                        pool_id,
                        tx_hash: Some(tx.tx_hash),
                        block_number: tx.block_number,
                        gas_used: tx.gas_used,
                        batch_size,
                        success: true,
                        error: None,
                        error_kind: None,
                        timestamp: Utc::now(),
                    })
                    .await;
                    self.reveals.clear_executed_reveals(&hashes).await;
                    return BatchExecution {
                        pool_id,
                        success: true,
                        tx_hash: Some(tx.tx_hash),
                        batch_size,
                        error: None,
                    };
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        let delay = self.config.retry_base_delay_ms.saturating_mul(1 << attempt);
                        warn!(
                            %pool_id,
                            attempt,
                            delay_ms = delay,
                            error = %e,
                            "batch execute failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    error!(
                        %pool_id,
                        attempts = attempt + 1,
                        error = %e,
                        "batch execute failed, retries exhausted"
                    );
                    self.record(ExecutionRecord {
                        pool_id,
                        tx_hash: None,
                        block_number: None,
                        gas_used: None,
                        batch_size,
                        success: false,
                        error: Some(e.to_string()),
                        error_kind: Some(e.kind().to_string()),
                        timestamp: Utc::now(),
                    })
                    .await;
                    return BatchExecution::failure(pool_id, batch_size, e.to_string());
                }
            }
        }
    }

    async fn record(&self, record: ExecutionRecord) {
        self.state.write().await.history.push(record);
    }

    pub async fn get_history(&self) -> Vec<ExecutionRecord> {
        self.state.read().await.history.clone()
    }

    pub async fn get_stats(&self) -> ExecutionStats {
        ExecutionStats::from_history(&self.state.read().await.history)
    }

    /// Start the readiness polling loop. Each iteration checks every
    /// registered pool and spawns an execution for the ready ones; the
    /// per-pool in-flight flag keeps executions from overlapping.
    pub async fn start_polling(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let executor = self.clone();
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        info!(poll_interval_ms = self.config.poll_interval_ms, "executor polling started");

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if !executor.running.load(Ordering::SeqCst) {
                    break;
                }
                executor.poll_once().await;
            }
        });

        *self.poll_handle.lock().await = Some(handle);
    }

    async fn poll_once(&self) {
        let pool_ids: Vec<B256> = {
            let state = self.state.read().await;
            state
                .pools
                .keys()
                .filter(|id| !state.in_flight.contains(*id))
                .copied()
                .collect()
        };

        for pool_id in pool_ids {
            match self.check_batch_readiness(pool_id).await {
                Ok(readiness) if readiness.ready => {
                    info!(
                        %pool_id,
                        reveals_ready = readiness.reveals_ready,
                        pending_on_chain = readiness.pending_on_chain,
                        "pool ready, initiating batch execution"
                    );
                    let executor = self.clone();
                    tokio::spawn(async move {
                        executor.execute(pool_id).await;
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(%pool_id, error = %e, "readiness check failed");
                }
            }
        }
    }

    /// Stop the polling loop. In-flight executions are not aborted.
    pub async fn stop_polling(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.poll_handle.lock().await.take() {
            handle.abort();
        }
        info!("executor polling stopped");
    }
}
