use alloy::primitives::B256;
use thiserror::Error;

use crate::hook::HookRevert;

/// Main error type for the batch-swap agent core
#[derive(Error, Debug)]
pub enum UmbraError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Local validation errors (no network I/O)
    #[error("Zero amount in intent")]
    ZeroAmount,

    #[error("Intent deadline expired: {0}")]
    DeadlineExpired(String),

    #[error("Commitment hash mismatch: expected {expected}, computed {computed}")]
    CommitmentHashMismatch { expected: B256, computed: B256 },

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    // Coordination errors
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Quorum lost for pool {0}")]
    QuorumLost(B256),

    #[error("No participating agents for pool {0}")]
    NoParticipatingAgents(B256),

    // Execution ordering errors
    #[error("No submitted reveals for pool {0}")]
    NoSubmittedReveals(B256),

    #[error("Missing ZK proof for commitment {0}")]
    MissingZkProof(B256),

    #[error("Batch execution already in flight for pool {0}")]
    ExecutionInFlight(B256),

    // On-chain revert errors (typed via the hook selector table)
    #[error("Hook reverted: {0}")]
    Revert(HookRevert),

    // Transport errors
    #[error("Network timeout: {0}")]
    NetworkTimeout(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    // Crypto/signing errors
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Signature error: {0}")]
    Signature(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl UmbraError {
    /// Whether this failure should consume an executor retry.
    ///
    /// Ordering-contract failures abort the attempt outright; reverts and
    /// transport failures are retried with backoff.
    pub fn consumes_retry(&self) -> bool {
        matches!(
            self,
            UmbraError::Revert(_) | UmbraError::NetworkTimeout(_) | UmbraError::Rpc(_)
        )
    }

    /// Machine-readable kind for history entries and logs
    pub fn kind(&self) -> &'static str {
        match self {
            UmbraError::Config(_) => "config",
            UmbraError::ZeroAmount => "zero_amount",
            UmbraError::DeadlineExpired(_) => "deadline_expired",
            UmbraError::CommitmentHashMismatch { .. } => "commitment_hash_mismatch",
            UmbraError::InvalidMarketData(_) => "invalid_market_data",
            UmbraError::Validation(_) => "validation",
            UmbraError::UnknownAgent(_) => "unknown_agent",
            UmbraError::QuorumLost(_) => "quorum_lost",
            UmbraError::NoParticipatingAgents(_) => "no_participating_agents",
            UmbraError::NoSubmittedReveals(_) => "no_submitted_reveals",
            UmbraError::MissingZkProof(_) => "missing_zk_proof",
            UmbraError::ExecutionInFlight(_) => "execution_in_flight",
            UmbraError::Revert(r) => r.kind(),
            UmbraError::NetworkTimeout(_) => "network_timeout",
            UmbraError::Rpc(_) => "rpc_error",
            UmbraError::Wallet(_) => "wallet",
            UmbraError::Signature(_) => "signature",
            UmbraError::Json(_) => "json",
            UmbraError::Io(_) => "io",
            UmbraError::Internal(_) => "internal",
            UmbraError::Cancelled => "cancelled",
            UmbraError::Other(_) => "other",
        }
    }
}

/// Result type alias for UmbraError
pub type Result<T> = std::result::Result<T, UmbraError>;
