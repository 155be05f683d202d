//! Batch coordinator — per-pool readiness/quorum state machine
//!
//! Agents report readiness per pool. When a pool reaches quorum (distinct
//! ready agents AND total pending commitments) the pool arms a countdown;
//! when every registered agent is ready the pool fires immediately,
//! bypassing the rest of the countdown. Fired pools emit a
//! `BatchReadyEvent` on a bounded channel with a single consumer, then
//! return to idle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::config::CoordinatorConfig;
use crate::coordinator::state::{
    AgentReadinessSignal, BatchParameters, BatchReadyEvent, PoolStatus,
};
use crate::error::{Result, UmbraError};

/// Slippage applied when no ready agent stated a preference
const FALLBACK_SLIPPAGE_BPS: u32 = 50;

struct Countdown {
    deadline: chrono::DateTime<Utc>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct PoolEntry {
    /// Ready signals in insertion order; one entry per ready agent
    signals: Vec<AgentReadinessSignal>,
    countdown: Option<Countdown>,
}

impl PoolEntry {
    fn total_pending(&self) -> u32 {
        self.signals.iter().map(|s| s.pending_commitments).sum()
    }

    fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.handle.abort();
        }
    }
}

struct CoordinatorInner {
    registered: HashSet<String>,
    pools: HashMap<B256, PoolEntry>,
    destroyed: bool,
}

/// Multi-agent batch coordinator. Clone-friendly: clones share state.
#[derive(Clone)]
pub struct BatchCoordinator {
    config: CoordinatorConfig,
    inner: Arc<RwLock<CoordinatorInner>>,
    event_tx: mpsc::Sender<BatchReadyEvent>,
}

impl BatchCoordinator {
    /// Create a coordinator and the receiving end of its batch-ready
    /// channel
    pub fn new(config: CoordinatorConfig) -> (Self, mpsc::Receiver<BatchReadyEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let coordinator = Self {
            config,
            inner: Arc::new(RwLock::new(CoordinatorInner {
                registered: HashSet::new(),
                pools: HashMap::new(),
                destroyed: false,
            })),
            event_tx,
        };
        (coordinator, event_rx)
    }

    pub async fn register_agent(&self, agent_id: impl Into<String>) {
        let agent_id = agent_id.into();
        let mut inner = self.inner.write().await;
        if inner.registered.insert(agent_id.clone()) {
            info!(agent_id, "agent registered with coordinator");
        }
    }

    /// Remove an agent and clear its ready-signal in every pool. Pools
    /// whose quorum no longer holds drop back to idle.
    pub async fn unregister_agent(&self, agent_id: &str) {
        let mut inner = self.inner.write().await;
        if !inner.registered.remove(agent_id) {
            return;
        }
        let quorum = self.config.quorum;
        let min_total = self.config.min_total_commitments;
        for (pool_id, entry) in inner.pools.iter_mut() {
            entry.signals.retain(|s| s.agent_id != agent_id);
            let quorum_met =
                entry.signals.len() >= quorum && entry.total_pending() >= min_total;
            if entry.countdown.is_some() && !quorum_met {
                entry.cancel_countdown();
                info!(%pool_id, agent_id, "countdown cancelled after unregister");
            }
        }
        info!(agent_id, "agent unregistered from coordinator");
    }

    /// Process a readiness signal. Signals from unregistered agents are
    /// rejected without mutating state.
    pub async fn signal_ready(&self, signal: AgentReadinessSignal) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.destroyed {
            return Err(UmbraError::Cancelled);
        }
        if !inner.registered.contains(&signal.agent_id) {
            warn!(
                agent_id = %signal.agent_id,
                pool_id = %signal.pool_id,
                "readiness signal from unregistered agent rejected"
            );
            return Err(UmbraError::UnknownAgent(signal.agent_id));
        }

        let pool_id = signal.pool_id;
        let is_ready = signal.ready;
        let agent_id = signal.agent_id.clone();

        {
            let entry = inner.pools.entry(pool_id).or_default();
            if is_ready {
                // Re-signals keep their original insertion position
                match entry.signals.iter().position(|s| s.agent_id == agent_id) {
                    Some(pos) => entry.signals[pos] = signal,
                    None => entry.signals.push(signal),
                }
            } else {
                entry.signals.retain(|s| s.agent_id != agent_id);
            }
        }

        self.evaluate_pool(&mut inner, pool_id).await;
        Ok(())
    }

    /// Remove an agent from a pool's ready-set, equivalent to a
    /// `ready = false` signal
    pub async fn withdraw_ready(&self, agent_id: &str, pool_id: B256) -> Result<()> {
        self.signal_ready(AgentReadinessSignal::not_ready(agent_id, pool_id))
            .await
    }

    /// Re-check quorum for one pool: fire, arm, or cancel as appropriate.
    /// Caller holds the write lock.
    async fn evaluate_pool(
        &self,
        inner: &mut tokio::sync::RwLockWriteGuard<'_, CoordinatorInner>,
        pool_id: B256,
    ) {
        let quorum = self.config.quorum;
        let min_total = self.config.min_total_commitments;
        let registered: Vec<String> = inner.registered.iter().cloned().collect();

        let (quorum_met, all_ready, armed) = {
            let Some(entry) = inner.pools.get(&pool_id) else {
                return;
            };
            let quorum_met =
                entry.signals.len() >= quorum && entry.total_pending() >= min_total;
            let all_ready = !registered.is_empty()
                && registered
                    .iter()
                    .all(|id| entry.signals.iter().any(|s| &s.agent_id == id));
            (quorum_met, all_ready, entry.countdown.is_some())
        };

        if !quorum_met {
            if armed {
                if let Some(entry) = inner.pools.get_mut(&pool_id) {
                    entry.cancel_countdown();
                }
                info!(%pool_id, "quorum lost, countdown cancelled");
            }
            return;
        }

        if all_ready {
            info!(%pool_id, "all registered agents ready, firing immediately");
            self.fire_locked(inner, pool_id).await;
            return;
        }

        if !armed {
            let deadline =
                Utc::now() + chrono::Duration::milliseconds(self.config.countdown_ms as i64);
            let this = self.clone();
            let countdown_ms = self.config.countdown_ms;
            let handle = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(countdown_ms)).await;
                this.fire_on_countdown(pool_id).await;
            });
            if let Some(entry) = inner.pools.get_mut(&pool_id) {
                entry.countdown = Some(Countdown { deadline, handle });
                info!(%pool_id, countdown_ms, "quorum met, countdown armed");
            } else {
                handle.abort();
            }
        }
    }

    /// Countdown expiry path: fire if the pool is still armed and quorum
    /// still holds
    async fn fire_on_countdown(&self, pool_id: B256) {
        let mut inner = self.inner.write().await;
        if inner.destroyed {
            return;
        }
        let still_armed = inner
            .pools
            .get(&pool_id)
            .map(|e| {
                e.countdown.is_some()
                    && e.signals.len() >= self.config.quorum
                    && e.total_pending() >= self.config.min_total_commitments
            })
            .unwrap_or(false);
        if !still_armed {
            debug!(%pool_id, "countdown expired but pool no longer armed");
            return;
        }
        info!(%pool_id, "countdown expired, firing");
        self.fire_locked(&mut inner, pool_id).await;
    }

    /// Resolve parameters, emit the event, and return the pool to idle.
    /// The event is sent while the lock is held so that `destroy()`
    /// cannot return between resolution and delivery.
    async fn fire_locked(
        &self,
        inner: &mut tokio::sync::RwLockWriteGuard<'_, CoordinatorInner>,
        pool_id: B256,
    ) {
        let params = match Self::resolve_locked(&self.config, inner, pool_id) {
            Ok(params) => params,
            Err(e) => {
                warn!(%pool_id, error = %e, "fire aborted");
                return;
            }
        };

        if let Some(entry) = inner.pools.get_mut(&pool_id) {
            entry.cancel_countdown();
            entry.signals.clear();
        }

        info!(
            %pool_id,
            agents = params.participating_agents.len(),
            total_commitments = params.total_commitments,
            slippage_bps = params.slippage_bps,
            "batch window fired"
        );

        if self
            .event_tx
            .send(BatchReadyEvent { pool_id, params })
            .await
            .is_err()
        {
            warn!(%pool_id, "batch-ready consumer dropped, event lost");
        }
    }

    fn resolve_locked(
        config: &CoordinatorConfig,
        inner: &CoordinatorInner,
        pool_id: B256,
    ) -> Result<BatchParameters> {
        let entry = inner
            .pools
            .get(&pool_id)
            .filter(|e| !e.signals.is_empty())
            .ok_or(UmbraError::NoParticipatingAgents(pool_id))?;

        let participating_agents: Vec<String> =
            entry.signals.iter().map(|s| s.agent_id.clone()).collect();
        let total_commitments = entry.total_pending();
        let preferences: Vec<u32> = entry
            .signals
            .iter()
            .filter_map(|s| s.preferred_slippage_bps)
            .collect();
        let slippage_bps = config
            .conflict_resolution
            .resolve(&preferences)
            .unwrap_or(FALLBACK_SLIPPAGE_BPS);

        Ok(BatchParameters {
            pool_id,
            participating_agents,
            total_commitments,
            slippage_bps,
            fired_at: Utc::now(),
        })
    }

    /// Resolve batch parameters from the current ready set without firing
    pub async fn resolve_batch_parameters(&self, pool_id: B256) -> Result<BatchParameters> {
        let inner = self.inner.read().await;
        Self::resolve_locked(&self.config, &inner, pool_id)
    }

    /// Observable per-pool state
    pub async fn pool_status(&self, pool_id: B256) -> PoolStatus {
        let inner = self.inner.read().await;
        let Some(entry) = inner.pools.get(&pool_id) else {
            return PoolStatus::default();
        };
        let total_pending = entry.total_pending();
        PoolStatus {
            total_ready: entry.signals.len(),
            ready_agents: entry.signals.iter().map(|s| s.agent_id.clone()).collect(),
            quorum_met: entry.signals.len() >= self.config.quorum
                && total_pending >= self.config.min_total_commitments,
            countdown_active: entry.countdown.is_some(),
            total_pending_commitments: total_pending,
            countdown_deadline: entry.countdown.as_ref().map(|c| c.deadline),
        }
    }

    /// True iff every registered agent has signalled ready for this pool
    pub async fn all_agents_ready(&self, pool_id: B256) -> bool {
        let inner = self.inner.read().await;
        if inner.registered.is_empty() {
            return false;
        }
        let Some(entry) = inner.pools.get(&pool_id) else {
            return false;
        };
        inner
            .registered
            .iter()
            .all(|id| entry.signals.iter().any(|s| &s.agent_id == id))
    }

    /// Clear signals, ready-set, and countdown unconditionally
    pub async fn reset_pool(&self, pool_id: B256) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.pools.get_mut(&pool_id) {
            entry.cancel_countdown();
            entry.signals.clear();
        }
        debug!(%pool_id, "pool coordination state reset");
    }

    /// Cancel all timers. Signals processed before this call have already
    /// taken effect; no batch-ready events fire after it returns.
    pub async fn destroy(&self) {
        let mut inner = self.inner.write().await;
        inner.destroyed = true;
        for entry in inner.pools.values_mut() {
            entry.cancel_countdown();
        }
        info!("coordinator destroyed, all countdown timers cancelled");
    }
}
