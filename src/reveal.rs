//! Reveal buffer
//!
//! Holds the set of reveals the agent intends to submit, validates them
//! before any network I/O, drives submission, and answers the executor's
//! hashes-to-execute lookup. Reveals are submitted in the order they were
//! added, per pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{B256, U256};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{CommitmentHash, PoolKey, RevealData, SwapIntent};
use crate::hook::HookApi;

/// Outcome of validating one reveal locally
#[derive(Debug, Clone)]
pub struct RevealValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Per-reveal outcome of a submission pass
#[derive(Debug, Clone)]
pub struct RevealSubmission {
    pub commitment_hash: CommitmentHash,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct RevealStore {
    reveals: HashMap<CommitmentHash, RevealData>,
    /// FIFO add order per pool
    pool_order: HashMap<B256, Vec<CommitmentHash>>,
}

/// Validated buffer of reveals awaiting submission
pub struct RevealManager {
    hook: Arc<dyn HookApi>,
    /// Optional pause between successive submissions
    submission_delay: Option<Duration>,
    store: RwLock<RevealStore>,
}

impl RevealManager {
    pub fn new(hook: Arc<dyn HookApi>) -> Self {
        Self {
            hook,
            submission_delay: None,
            store: RwLock::new(RevealStore::default()),
        }
    }

    pub fn with_submission_delay(mut self, delay_ms: u64) -> Self {
        self.submission_delay = (delay_ms > 0).then(|| Duration::from_millis(delay_ms));
        self
    }

    /// Store a reveal as pending. Idempotent on commitment hash: a second
    /// add with the same hash is ignored.
    pub async fn add_reveal(
        &self,
        commitment_hash: CommitmentHash,
        intent: SwapIntent,
        pool_key: PoolKey,
        pool_id: B256,
        is_zk_verified: bool,
    ) {
        let mut store = self.store.write().await;
        if store.reveals.contains_key(&commitment_hash) {
            debug!(%commitment_hash, "duplicate reveal ignored");
            return;
        }
        store.reveals.insert(
            commitment_hash,
            RevealData::new(commitment_hash, intent, pool_key, pool_id, is_zk_verified),
        );
        store
            .pool_order
            .entry(pool_id)
            .or_default()
            .push(commitment_hash);
        debug!(%commitment_hash, %pool_id, is_zk_verified, "reveal buffered");
    }

    /// All reveals for a pool, in FIFO add order
    pub async fn get_reveals_for_pool(&self, pool_id: B256) -> Vec<RevealData> {
        let store = self.store.read().await;
        store
            .pool_order
            .get(&pool_id)
            .map(|order| {
                order
                    .iter()
                    .filter_map(|h| store.reveals.get(h).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Hashes of reveals already submitted on chain, in FIFO add order
    pub async fn get_submitted_hashes_for_pool(&self, pool_id: B256) -> Vec<CommitmentHash> {
        let store = self.store.read().await;
        store
            .pool_order
            .get(&pool_id)
            .map(|order| {
                order
                    .iter()
                    .filter(|h| {
                        store
                            .reveals
                            .get(*h)
                            .map(|r| r.submitted_on_chain)
                            .unwrap_or(false)
                    })
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of reveals not yet submitted on chain
    pub async fn get_pending_count(&self) -> u32 {
        let store = self.store.read().await;
        store.reveals.values().filter(|r| r.is_pending()).count() as u32
    }

    /// Local validation, no network I/O.
    ///
    /// ZK-verified reveals skip the hash recomputation: their commitment
    /// was proven against the intent off-chain.
    pub fn validate_reveal(reveal: &RevealData) -> RevealValidation {
        let mut errors = Vec::new();

        if reveal.intent.amount_in == U256::ZERO {
            errors.push("Zero amount in intent".to_string());
        }

        let now_unix = Utc::now().timestamp().max(0) as u64;
        if reveal.intent.is_expired_at(now_unix) {
            errors.push(format!(
                "Intent deadline expired: deadline={} now={}",
                reveal.intent.deadline, now_unix
            ));
        }

        if !reveal.is_zk_verified {
            let computed = reveal.intent.commitment_hash();
            if computed != reveal.commitment_hash {
                errors.push(format!(
                    "Commitment hash mismatch: expected {} computed {}",
                    reveal.commitment_hash, computed
                ));
            }
        }

        RevealValidation {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Submit every pending reveal, preserving FIFO order per pool.
    ///
    /// Invalid reveals are skipped with their errors recorded; failed
    /// submissions stay pending for the next pass.
    pub async fn submit_all_reveals(&self) -> Vec<RevealSubmission> {
        let pending: Vec<CommitmentHash> = {
            let store = self.store.read().await;
            store
                .pool_order
                .values()
                .flatten()
                .filter(|h| {
                    store
                        .reveals
                        .get(*h)
                        .map(|r| r.is_pending())
                        .unwrap_or(false)
                })
                .copied()
                .collect()
        };

        if pending.is_empty() {
            return Vec::new();
        }

        info!(count = pending.len(), "submitting pending reveals");

        let mut outcomes = Vec::with_capacity(pending.len());
        let mut first = true;

        for hash in pending {
            let Some(reveal) = self.store.read().await.reveals.get(&hash).cloned() else {
                continue;
            };

            let validation = Self::validate_reveal(&reveal);
            if !validation.is_valid {
                warn!(%hash, errors = ?validation.errors, "reveal failed validation, skipping");
                let mut store = self.store.write().await;
                if let Some(stored) = store.reveals.get_mut(&hash) {
                    stored.errors.extend(validation.errors.iter().cloned());
                }
                outcomes.push(RevealSubmission {
                    commitment_hash: hash,
                    success: false,
                    error: Some(validation.errors.join("; ")),
                });
                continue;
            }

            if !first {
                if let Some(delay) = self.submission_delay {
                    tokio::time::sleep(delay).await;
                }
            }
            first = false;

            let result = if reveal.is_zk_verified {
                self.hook
                    .submit_reveal_for_zk(&reveal.pool_key, hash, &reveal.intent)
                    .await
            } else {
                self.hook.submit_reveal(&reveal.pool_key, &reveal.intent).await
            };

            match result {
                Ok(outcome) => {
                    debug!(%hash, tx_hash = %outcome.tx_hash, "reveal submitted");
                    let mut store = self.store.write().await;
                    if let Some(stored) = store.reveals.get_mut(&hash) {
                        stored.submitted_on_chain = true;
                        stored.submitted_at = Some(Utc::now());
                    }
                    outcomes.push(RevealSubmission {
                        commitment_hash: hash,
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(%hash, error = %e, "reveal submission failed, left pending");
                    let mut store = self.store.write().await;
                    if let Some(stored) = store.reveals.get_mut(&hash) {
                        stored.errors.push(e.to_string());
                    }
                    outcomes.push(RevealSubmission {
                        commitment_hash: hash,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        outcomes
    }

    /// Drop reveals whose hashes were included in a successful batch
    /// execute
    pub async fn clear_executed_reveals(&self, hashes: &[CommitmentHash]) {
        let mut store = self.store.write().await;
        for hash in hashes {
            store.reveals.remove(hash);
        }
        for order in store.pool_order.values_mut() {
            order.retain(|h| !hashes.contains(h));
        }
        debug!(count = hashes.len(), "executed reveals cleared");
    }

    pub async fn clear_pool(&self, pool_id: B256) {
        let mut store = self.store.write().await;
        if let Some(order) = store.pool_order.remove(&pool_id) {
            for hash in order {
                store.reveals.remove(&hash);
            }
        }
    }

    pub async fn clear_all(&self) {
        let mut store = self.store.write().await;
        store.reveals.clear();
        store.pool_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::MockHook;
    use alloy::primitives::{address, Address};

    fn pool_key() -> PoolKey {
        PoolKey::new(
            address!("0x1111111111111111111111111111111111111111"),
            address!("0x2222222222222222222222222222222222222222"),
            3000,
            60,
            address!("0x3333333333333333333333333333333333333333"),
        )
    }

    fn intent(nonce: u64) -> SwapIntent {
        SwapIntent {
            intent_id: uuid::Uuid::new_v4(),
            user: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            token_in: address!("0x1111111111111111111111111111111111111111"),
            token_out: address!("0x2222222222222222222222222222222222222222"),
            amount_in: U256::from(1000u64),
            min_amount_out: U256::from(990u64),
            recipient: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            nonce: U256::from(nonce),
            deadline: U256::from(4_000_000_000u64),
        }
    }

    fn manager() -> (Arc<MockHook>, RevealManager) {
        let hook = Arc::new(MockHook::new());
        let mgr = RevealManager::new(hook.clone());
        (hook, mgr)
    }

    #[tokio::test]
    async fn add_reveal_is_idempotent_on_hash() {
        let (_, mgr) = manager();
        let key = pool_key();
        let pool_id = key.pool_id();
        let i = intent(1);
        let hash = i.commitment_hash();

        mgr.add_reveal(hash, i.clone(), key, pool_id, false).await;
        mgr.add_reveal(hash, i, key, pool_id, false).await;

        assert_eq!(mgr.get_reveals_for_pool(pool_id).await.len(), 1);
        assert_eq!(mgr.get_pending_count().await, 1);
    }

    #[tokio::test]
    async fn reveals_keep_fifo_order() {
        let (_, mgr) = manager();
        let key = pool_key();
        let pool_id = key.pool_id();

        for nonce in 1..=4u64 {
            let i = intent(nonce);
            mgr.add_reveal(i.commitment_hash(), i, key, pool_id, false)
                .await;
        }

        let reveals = mgr.get_reveals_for_pool(pool_id).await;
        let nonces: Vec<u64> = reveals
            .iter()
            .map(|r| r.intent.nonce.to::<u64>())
            .collect();
        assert_eq!(nonces, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn submit_all_marks_submitted_in_order() {
        let (hook, mgr) = manager();
        let key = pool_key();
        let pool_id = key.pool_id();

        for nonce in 1..=3u64 {
            let i = intent(nonce);
            mgr.add_reveal(i.commitment_hash(), i, key, pool_id, false)
                .await;
        }

        let outcomes = mgr.submit_all_reveals().await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(hook.call_count("submit_reveal"), 3);

        let submitted = mgr.get_submitted_hashes_for_pool(pool_id).await;
        let expected: Vec<_> = (1..=3u64).map(|n| intent(n).commitment_hash()).collect();
        assert_eq!(submitted, expected);
        assert_eq!(mgr.get_pending_count().await, 0);
    }

    #[tokio::test]
    async fn zk_reveals_use_zk_submission_path() {
        let (hook, mgr) = manager();
        let key = pool_key();
        let pool_id = key.pool_id();
        let i = intent(1);
        mgr.add_reveal(i.commitment_hash(), i, key, pool_id, true)
            .await;

        mgr.submit_all_reveals().await;
        assert_eq!(hook.call_count("submit_reveal_for_zk"), 1);
        assert_eq!(hook.call_count("submit_reveal"), 0);
    }

    #[tokio::test]
    async fn failed_submission_stays_pending() {
        let (hook, mgr) = manager();
        hook.fail_next_reveal_submits(1);
        let key = pool_key();
        let pool_id = key.pool_id();
        let i = intent(1);
        mgr.add_reveal(i.commitment_hash(), i, key, pool_id, false)
            .await;

        let outcomes = mgr.submit_all_reveals().await;
        assert!(!outcomes[0].success);
        assert_eq!(mgr.get_pending_count().await, 1);
        assert!(mgr.get_submitted_hashes_for_pool(pool_id).await.is_empty());

        // Next pass succeeds
        let outcomes = mgr.submit_all_reveals().await;
        assert!(outcomes[0].success);
        assert_eq!(mgr.get_pending_count().await, 0);
    }

    #[tokio::test]
    async fn validation_rejects_zero_amount() {
        let key = pool_key();
        let mut i = intent(1);
        i.amount_in = U256::ZERO;
        let reveal = RevealData::new(i.commitment_hash(), i, key, key.pool_id(), false);

        let v = RevealManager::validate_reveal(&reveal);
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("Zero amount")));
    }

    #[tokio::test]
    async fn validation_rejects_expired_deadline() {
        let key = pool_key();
        let mut i = intent(1);
        i.deadline = U256::from(1u64);
        let reveal = RevealData::new(i.commitment_hash(), i, key, key.pool_id(), false);

        let v = RevealManager::validate_reveal(&reveal);
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("deadline expired")));
    }

    #[tokio::test]
    async fn validation_rejects_hash_mismatch_unless_zk() {
        let key = pool_key();
        let i = intent(1);
        let wrong_hash = intent(2).commitment_hash();

        let reveal = RevealData::new(wrong_hash, i.clone(), key, key.pool_id(), false);
        let v = RevealManager::validate_reveal(&reveal);
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("hash mismatch")));

        // ZK-verified reveals skip the recomputation
        let reveal = RevealData::new(wrong_hash, i, key, key.pool_id(), true);
        let v = RevealManager::validate_reveal(&reveal);
        assert!(v.is_valid);
    }

    #[tokio::test]
    async fn invalid_reveal_is_skipped_and_not_submitted() {
        let (hook, mgr) = manager();
        let key = pool_key();
        let pool_id = key.pool_id();
        let mut i = intent(1);
        i.amount_in = U256::ZERO;
        mgr.add_reveal(i.commitment_hash(), i, key, pool_id, false)
            .await;

        let outcomes = mgr.submit_all_reveals().await;
        assert!(!outcomes[0].success);
        assert_eq!(hook.call_count("submit_reveal"), 0);

        let reveals = mgr.get_reveals_for_pool(pool_id).await;
        assert!(!reveals[0].errors.is_empty());
    }

    #[tokio::test]
    async fn clear_executed_removes_only_listed_hashes() {
        let (_, mgr) = manager();
        let key = pool_key();
        let pool_id = key.pool_id();
        let keep = intent(1);
        let drop = intent(2);
        mgr.add_reveal(keep.commitment_hash(), keep.clone(), key, pool_id, false)
            .await;
        mgr.add_reveal(drop.commitment_hash(), drop.clone(), key, pool_id, false)
            .await;

        mgr.clear_executed_reveals(&[drop.commitment_hash()]).await;

        let reveals = mgr.get_reveals_for_pool(pool_id).await;
        assert_eq!(reveals.len(), 1);
        assert_eq!(reveals[0].commitment_hash, keep.commitment_hash());
    }

    #[tokio::test]
    async fn clear_all_leaves_empty_state() {
        let (_, mgr) = manager();
        let key = pool_key();
        let pool_id = key.pool_id();

        mgr.clear_all().await;
        let i = intent(1);
        mgr.add_reveal(i.commitment_hash(), i, key, pool_id, false)
            .await;
        mgr.clear_all().await;
        assert_eq!(mgr.get_pending_count().await, 0);
        assert!(mgr.get_reveals_for_pool(pool_id).await.is_empty());
    }
}
