//! In-memory hook for tests and offline simulation
//!
//! Records every call and lets the caller script failures, mirroring the
//! contract surface without a chain.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::primitives::{keccak256, B256};
use async_trait::async_trait;

use crate::domain::{CommitmentHash, PoolKey, SwapIntent, ZkProof};
use crate::error::{Result, UmbraError};
use crate::hook::api::{BatchCheck, HookApi, TxOutcome};
use crate::hook::errors::HookRevert;

#[derive(Default)]
struct MockState {
    can_exec: bool,
    pending_count: u32,
    min_commitments: u32,
    verified: HashSet<CommitmentHash>,
    /// Fail this many upcoming reveal submissions
    fail_reveal_submits: u32,
    /// Fail this many upcoming batch executes with the given revert
    fail_executes: u32,
    execute_revert: Option<HookRevert>,
    calls: HashMap<&'static str, u32>,
    executed_batches: Vec<Vec<CommitmentHash>>,
    tx_counter: u64,
}

/// Scriptable in-memory implementation of [`HookApi`]
pub struct MockHook {
    state: Mutex<MockState>,
}

impl Default for MockHook {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHook {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                min_commitments: 1,
                ..Default::default()
            }),
        }
    }

    pub fn set_can_exec(&self, can_exec: bool) {
        self.state.lock().expect("mock lock").can_exec = can_exec;
    }

    pub fn set_pending_count(&self, count: u32) {
        self.state.lock().expect("mock lock").pending_count = count;
    }

    pub fn set_min_commitments(&self, minimum: u32) {
        self.state.lock().expect("mock lock").min_commitments = minimum;
    }

    pub fn mark_verified(&self, hash: CommitmentHash) {
        self.state.lock().expect("mock lock").verified.insert(hash);
    }

    /// Fail the next `n` reveal submissions with an RPC error
    pub fn fail_next_reveal_submits(&self, n: u32) {
        self.state.lock().expect("mock lock").fail_reveal_submits = n;
    }

    /// Fail the next `n` batch executes with the given revert
    pub fn fail_next_executes(&self, n: u32, revert: HookRevert) {
        let mut state = self.state.lock().expect("mock lock");
        state.fail_executes = n;
        state.execute_revert = Some(revert);
    }

    pub fn call_count(&self, op: &str) -> u32 {
        *self
            .state
            .lock()
            .expect("mock lock")
            .calls
            .get(op)
            .unwrap_or(&0)
    }

    pub fn executed_batches(&self) -> Vec<Vec<CommitmentHash>> {
        self.state
            .lock()
            .expect("mock lock")
            .executed_batches
            .clone()
    }

    fn record(state: &mut MockState, op: &'static str) {
        *state.calls.entry(op).or_insert(0) += 1;
    }

    fn outcome(state: &mut MockState, op: &str) -> TxOutcome {
        state.tx_counter += 1;
        let mut data = op.as_bytes().to_vec();
        data.extend_from_slice(&state.tx_counter.to_be_bytes());
        TxOutcome {
            tx_hash: keccak256(&data),
            block_number: Some(state.tx_counter),
            gas_used: Some(21_000 + state.tx_counter * 1000),
            success: true,
        }
    }
}

#[async_trait]
impl HookApi for MockHook {
    async fn submit_commitment(
        &self,
        _pool_key: &PoolKey,
        _hash: CommitmentHash,
    ) -> Result<TxOutcome> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "submit_commitment");
        state.pending_count += 1;
        Ok(Self::outcome(&mut state, "submit_commitment"))
    }

    async fn submit_commitment_with_proof(
        &self,
        _pool_key: &PoolKey,
        hash: CommitmentHash,
        _proof: &ZkProof,
    ) -> Result<TxOutcome> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "submit_commitment_with_proof");
        state.pending_count += 1;
        state.verified.insert(hash);
        Ok(Self::outcome(&mut state, "submit_commitment_with_proof"))
    }

    async fn submit_reveal(&self, _pool_key: &PoolKey, _intent: &SwapIntent) -> Result<TxOutcome> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "submit_reveal");
        if state.fail_reveal_submits > 0 {
            state.fail_reveal_submits -= 1;
            return Err(UmbraError::Rpc("mock reveal submission failure".into()));
        }
        Ok(Self::outcome(&mut state, "submit_reveal"))
    }

    async fn submit_reveal_for_zk(
        &self,
        _pool_key: &PoolKey,
        _hash: CommitmentHash,
        _intent: &SwapIntent,
    ) -> Result<TxOutcome> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "submit_reveal_for_zk");
        if state.fail_reveal_submits > 0 {
            state.fail_reveal_submits -= 1;
            return Err(UmbraError::Rpc("mock reveal submission failure".into()));
        }
        Ok(Self::outcome(&mut state, "submit_reveal_for_zk"))
    }

    async fn reveal_and_batch_execute(
        &self,
        _pool_key: &PoolKey,
        hashes: &[CommitmentHash],
    ) -> Result<TxOutcome> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "reveal_and_batch_execute");
        if state.fail_executes > 0 {
            state.fail_executes -= 1;
            let revert = state
                .execute_revert
                .unwrap_or(HookRevert::BatchConditionsNotMet);
            return Err(UmbraError::Revert(revert));
        }
        state.executed_batches.push(hashes.to_vec());
        Ok(Self::outcome(&mut state, "reveal_and_batch_execute"))
    }

    async fn reveal_and_batch_execute_with_proofs(
        &self,
        _pool_key: &PoolKey,
        hashes: &[CommitmentHash],
        proofs: &[ZkProof],
    ) -> Result<TxOutcome> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "reveal_and_batch_execute_with_proofs");
        if proofs.len() != hashes.len() {
            return Err(UmbraError::Validation(format!(
                "proof count {} does not match batch size {}",
                proofs.len(),
                hashes.len()
            )));
        }
        if state.fail_executes > 0 {
            state.fail_executes -= 1;
            let revert = state
                .execute_revert
                .unwrap_or(HookRevert::BatchConditionsNotMet);
            return Err(UmbraError::Revert(revert));
        }
        state.executed_batches.push(hashes.to_vec());
        Ok(Self::outcome(&mut state, "reveal_and_batch_execute_with_proofs"))
    }

    async fn checker(&self, _pool_id: B256) -> Result<BatchCheck> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "checker");
        Ok(BatchCheck {
            can_exec: state.can_exec,
            exec_payload: Default::default(),
        })
    }

    async fn get_pending_commitment_count(&self, _pool_id: B256) -> Result<u32> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "get_pending_commitment_count");
        Ok(state.pending_count)
    }

    async fn is_commitment_verified(&self, hash: CommitmentHash) -> Result<bool> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "is_commitment_verified");
        Ok(state.verified.contains(&hash))
    }

    async fn get_min_commitments(&self) -> Result<u32> {
        let mut state = self.state.lock().expect("mock lock");
        Self::record(&mut state, "get_min_commitments");
        Ok(state.min_commitments)
    }
}
