//! Swap intents and their commit-reveal lifecycle types

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::SolValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PoolKey;

/// 32-byte commitment digest of an abi-encoded intent
pub type CommitmentHash = B256;

/// A swap intent. Immutable once constructed.
///
/// The nonce is unique per (pool_id, user) forever; the deadline is a unix
/// second. `intent_id` is a process-local tracking id for logs; it never
/// leaves the process and is not part of the canonical encoding.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct SwapIntent {
    /// Tracking id for logs and correlation
    #[serde(default = "Uuid::new_v4")]
    pub intent_id: Uuid,
    pub user: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    pub nonce: U256,
    pub deadline: U256,
}

/// Equality follows the canonical encoding, so two intents are equal iff
/// they hash equal; the tracking id is ignored.
impl PartialEq for SwapIntent {
    fn eq(&self, other: &Self) -> bool {
        self.user == other.user
            && self.token_in == other.token_in
            && self.token_out == other.token_out
            && self.amount_in == other.amount_in
            && self.min_amount_out == other.min_amount_out
            && self.recipient == other.recipient
            && self.nonce == other.nonce
            && self.deadline == other.deadline
    }
}

/// Canonical encoding order for the commitment hash. Must match the
/// on-chain hash exactly.
type IntentTuple = (
    Address, // user
    Address, // tokenIn
    Address, // tokenOut
    U256,    // amountIn
    U256,    // minAmountOut
    Address, // recipient
    U256,    // nonce
    U256,    // deadline
);

impl SwapIntent {
    /// abi.encode(user, tokenIn, tokenOut, amountIn, minAmountOut,
    /// recipient, nonce, deadline)
    pub fn abi_encode_intent(&self) -> Vec<u8> {
        (
            self.user,
            self.token_in,
            self.token_out,
            self.amount_in,
            self.min_amount_out,
            self.recipient,
            self.nonce,
            self.deadline,
        )
            .abi_encode()
    }

    /// Inverse of [`abi_encode_intent`](Self::abi_encode_intent). The
    /// decoded intent gets a fresh tracking id.
    pub fn abi_decode_intent(data: &[u8]) -> Result<Self, alloy::sol_types::Error> {
        let (user, token_in, token_out, amount_in, min_amount_out, recipient, nonce, deadline) =
            <IntentTuple as SolValue>::abi_decode(data)?;
        Ok(Self {
            intent_id: Uuid::new_v4(),
            user,
            token_in,
            token_out,
            amount_in,
            min_amount_out,
            recipient,
            nonce,
            deadline,
        })
    }

    /// keccak256 over the canonical encoding. Two intents hash equal iff
    /// all fields are equal.
    pub fn commitment_hash(&self) -> CommitmentHash {
        keccak256(self.abi_encode_intent())
    }

    /// Whether the deadline has elapsed relative to `now` (unix seconds)
    pub fn is_expired_at(&self, now_unix: u64) -> bool {
        self.deadline < U256::from(now_unix)
    }
}

/// A revealed intent awaiting (or past) on-chain submission.
///
/// Lifecycle: pending → submitted → executed-and-cleared, or → errored
/// (retained for inspection).
#[derive(Debug, Clone)]
pub struct RevealData {
    pub commitment_hash: CommitmentHash,
    pub intent: SwapIntent,
    pub pool_key: PoolKey,
    pub pool_id: B256,
    pub is_zk_verified: bool,
    pub submitted_on_chain: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
}

impl RevealData {
    pub fn new(
        commitment_hash: CommitmentHash,
        intent: SwapIntent,
        pool_key: PoolKey,
        pool_id: B256,
        is_zk_verified: bool,
    ) -> Self {
        Self {
            commitment_hash,
            intent,
            pool_key,
            pool_id,
            is_zk_verified,
            submitted_on_chain: false,
            submitted_at: None,
            errors: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.submitted_on_chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn sample_intent() -> SwapIntent {
        SwapIntent {
            intent_id: Uuid::new_v4(),
            user: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            token_in: address!("0x1111111111111111111111111111111111111111"),
            token_out: address!("0x2222222222222222222222222222222222222222"),
            amount_in: U256::from(1_000_000_000_000_000_000u128),
            min_amount_out: U256::from(990_000_000_000_000_000u128),
            recipient: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            nonce: U256::from(7),
            deadline: U256::from(1_900_000_000u64),
        }
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(
            sample_intent().commitment_hash(),
            sample_intent().commitment_hash()
        );
    }

    #[test]
    fn hash_changes_with_every_field() {
        let base = sample_intent();
        let base_hash = base.commitment_hash();

        let mut m = base.clone();
        m.user = address!("0x4444444444444444444444444444444444444444");
        assert_ne!(m.commitment_hash(), base_hash);

        let mut m = base.clone();
        m.amount_in = base.amount_in + U256::from(1);
        assert_ne!(m.commitment_hash(), base_hash);

        let mut m = base.clone();
        m.min_amount_out = base.min_amount_out - U256::from(1);
        assert_ne!(m.commitment_hash(), base_hash);

        let mut m = base.clone();
        m.nonce = U256::from(8);
        assert_ne!(m.commitment_hash(), base_hash);

        let mut m = base.clone();
        m.deadline = base.deadline + U256::from(1);
        assert_ne!(m.commitment_hash(), base_hash);
    }

    #[test]
    fn tracking_id_is_not_part_of_identity() {
        let a = sample_intent();
        let mut b = a.clone();
        b.intent_id = Uuid::new_v4();
        assert_eq!(a, b);
        assert_eq!(a.commitment_hash(), b.commitment_hash());
    }

    #[test]
    fn encode_decode_round_trip() {
        let intent = sample_intent();
        let encoded = intent.abi_encode_intent();
        assert_eq!(encoded.len(), 8 * 32);
        let decoded = SwapIntent::abi_decode_intent(&encoded).expect("decode");
        assert_eq!(decoded, intent);
    }

    #[test]
    fn expiry_check() {
        let intent = sample_intent();
        assert!(!intent.is_expired_at(1_899_999_999));
        assert!(!intent.is_expired_at(1_900_000_000));
        assert!(intent.is_expired_at(1_900_000_001));
    }
}
