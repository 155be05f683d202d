//! Opaque zero-knowledge proof objects
//!
//! The core never inspects proofs; it only stores them keyed by
//! commitment hash and forwards them to the hook.

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::intent::{CommitmentHash, SwapIntent};
use crate::error::Result;

/// Groth16-shaped proof as produced by the external prover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProof {
    pub a: [U256; 2],
    pub b: [[U256; 2]; 2],
    pub c: [U256; 2],
    pub public_signals: Vec<U256>,
}

impl ZkProof {
    /// Placeholder proof for dry-run flows and tests
    pub fn empty() -> Self {
        Self {
            a: [U256::ZERO; 2],
            b: [[U256::ZERO; 2]; 2],
            c: [U256::ZERO; 2],
            public_signals: Vec::new(),
        }
    }
}

/// External prover collaborator. The core only associates the returned
/// proof with its commitment hash.
#[async_trait]
pub trait ProofGenerator: Send + Sync {
    async fn generate_proof(
        &self,
        intent: &SwapIntent,
        commitment: CommitmentHash,
    ) -> Result<ZkProof>;
}

/// Prover that returns empty proofs; for dry-run flows and tests
pub struct NullProofGenerator;

#[async_trait]
impl ProofGenerator for NullProofGenerator {
    async fn generate_proof(
        &self,
        _intent: &SwapIntent,
        _commitment: CommitmentHash,
    ) -> Result<ZkProof> {
        Ok(ZkProof::empty())
    }
}
