//! The typed RPC surface the rest of the core depends on
//!
//! Everything downstream of the hook (reveal manager, executor, agents)
//! talks to this trait, never to a concrete transport.

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;

use crate::domain::{CommitmentHash, PoolKey, SwapIntent, ZkProof};
use crate::error::Result;

/// Outcome of a state-changing hook call
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub success: bool,
}

/// Result of the hook's batch-readiness checker
#[derive(Debug, Clone)]
pub struct BatchCheck {
    pub can_exec: bool,
    pub exec_payload: Bytes,
}

#[async_trait]
pub trait HookApi: Send + Sync {
    async fn submit_commitment(
        &self,
        pool_key: &PoolKey,
        hash: CommitmentHash,
    ) -> Result<TxOutcome>;

    async fn submit_commitment_with_proof(
        &self,
        pool_key: &PoolKey,
        hash: CommitmentHash,
        proof: &ZkProof,
    ) -> Result<TxOutcome>;

    async fn submit_reveal(&self, pool_key: &PoolKey, intent: &SwapIntent) -> Result<TxOutcome>;

    async fn submit_reveal_for_zk(
        &self,
        pool_key: &PoolKey,
        hash: CommitmentHash,
        intent: &SwapIntent,
    ) -> Result<TxOutcome>;

    async fn reveal_and_batch_execute(
        &self,
        pool_key: &PoolKey,
        hashes: &[CommitmentHash],
    ) -> Result<TxOutcome>;

    async fn reveal_and_batch_execute_with_proofs(
        &self,
        pool_key: &PoolKey,
        hashes: &[CommitmentHash],
        proofs: &[ZkProof],
    ) -> Result<TxOutcome>;

    async fn checker(&self, pool_id: B256) -> Result<BatchCheck>;

    async fn get_pending_commitment_count(&self, pool_id: B256) -> Result<u32>;

    async fn is_commitment_verified(&self, hash: CommitmentHash) -> Result<bool>;

    async fn get_min_commitments(&self) -> Result<u32>;
}
