//! Concrete hook client over an alloy provider
//!
//! Contract bindings are generated with the `sol!` macro; transactions are
//! signed by the wallet baked into the provider. In dry-run mode write
//! operations log and return synthetic receipts without any network I/O.

use alloy::network::EthereumWallet;
use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::{CommitmentHash, PoolKey, SwapIntent, ZkProof};
use crate::error::{Result, UmbraError};
use crate::hook::api::{BatchCheck, HookApi, TxOutcome};
use crate::hook::errors::HookRevert;
use crate::signing::Wallet;

sol! {
    #[allow(missing_docs)]
    struct HookPoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    #[allow(missing_docs)]
    struct HookSwapIntent {
        address user;
        address tokenIn;
        address tokenOut;
        uint256 amountIn;
        uint256 minAmountOut;
        address recipient;
        uint256 nonce;
        uint256 deadline;
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IUmbraHook {
        function submitCommitment(HookPoolKey calldata key, bytes32 commitment) external;

        function submitCommitmentWithProof(
            HookPoolKey calldata key,
            bytes32 commitment,
            uint256[2] calldata a,
            uint256[2][2] calldata b,
            uint256[2] calldata c,
            uint256[] calldata publicSignals
        ) external;

        function submitReveal(HookPoolKey calldata key, HookSwapIntent calldata intent) external;

        function submitRevealForZK(
            HookPoolKey calldata key,
            bytes32 commitment,
            HookSwapIntent calldata intent
        ) external;

        function revealAndBatchExecute(
            HookPoolKey calldata key,
            bytes32[] calldata commitments
        ) external;

        function revealAndBatchExecuteWithProofs(
            HookPoolKey calldata key,
            bytes32[] calldata commitments,
            uint256[2][] calldata a,
            uint256[2][2][] calldata b,
            uint256[2][] calldata c,
            uint256[][] calldata publicSignals
        ) external;

        function checker(bytes32 poolId) external view returns (bool canExec, bytes memory execPayload);

        function getPendingCommitmentCount(bytes32 poolId) external view returns (uint256 count);

        function isCommitmentVerified(bytes32 commitment) external view returns (bool verified);

        function minCommitments() external view returns (uint256 minimum);
    }
}

/// Default minimum batch size reported in dry-run mode
const DRY_RUN_MIN_COMMITMENTS: u32 = 2;

/// Typed client for the batch-swap hook contract
pub struct HookClient {
    hook: Option<IUmbraHook::IUmbraHookInstance<DynProvider>>,
    hook_address: Address,
    dry_run: bool,
}

impl HookClient {
    /// Connect a signing provider and bind the hook contract
    pub async fn connect(rpc_url: &str, hook_address: Address, wallet: &Wallet) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.signer().clone()))
            .connect(rpc_url)
            .await
            .map_err(|e| UmbraError::Rpc(format!("failed to connect provider: {e}")))?
            .erased();

        info!(%hook_address, rpc_url, "hook client connected");

        Ok(Self {
            hook: Some(IUmbraHook::new(hook_address, provider)),
            hook_address,
            dry_run: false,
        })
    }

    /// Client that never touches the network; write calls return synthetic
    /// receipts
    pub fn dry_run(hook_address: Address) -> Self {
        warn!(%hook_address, "hook client in dry-run mode; no transactions will be sent");
        Self {
            hook: None,
            hook_address,
            dry_run: true,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn hook_address(&self) -> Address {
        self.hook_address
    }

    /// Pure, deterministic keccak commitment hash over the canonical
    /// intent encoding. Must match the on-chain hash exactly.
    pub fn compute_commitment_hash(intent: &SwapIntent) -> CommitmentHash {
        intent.commitment_hash()
    }

    /// Pure pool-id derivation from the key tuple
    pub fn get_pool_id(pool_key: &PoolKey) -> B256 {
        pool_key.pool_id()
    }

    /// Map a 4-byte revert selector to a typed error kind
    pub fn decode_error(selector: [u8; 4]) -> HookRevert {
        HookRevert::from_selector(selector)
    }

    fn instance(&self) -> Result<&IUmbraHook::IUmbraHookInstance<DynProvider>> {
        self.hook
            .as_ref()
            .ok_or_else(|| UmbraError::Internal("hook client has no provider (dry-run)".into()))
    }

    fn to_sol_key(key: &PoolKey) -> Result<HookPoolKey> {
        Ok(HookPoolKey {
            currency0: key.currency0,
            currency1: key.currency1,
            fee: key
                .fee
                .try_into()
                .map_err(|_| UmbraError::Validation(format!("fee {} exceeds uint24", key.fee)))?,
            tickSpacing: key.tick_spacing.try_into().map_err(|_| {
                UmbraError::Validation(format!("tick spacing {} exceeds int24", key.tick_spacing))
            })?,
            hooks: key.hooks,
        })
    }

    fn to_sol_intent(intent: &SwapIntent) -> HookSwapIntent {
        HookSwapIntent {
            user: intent.user,
            tokenIn: intent.token_in,
            tokenOut: intent.token_out,
            amountIn: intent.amount_in,
            minAmountOut: intent.min_amount_out,
            recipient: intent.recipient,
            nonce: intent.nonce,
            deadline: intent.deadline,
        }
    }

    /// Revert data carries the custom-error selector; everything else is a
    /// transport failure.
    fn classify_error(err: alloy::contract::Error) -> UmbraError {
        if let Some(data) = err.as_revert_data() {
            if data.len() >= 4 {
                let mut selector = [0u8; 4];
                selector.copy_from_slice(&data[..4]);
                return UmbraError::Revert(HookRevert::from_selector(selector));
            }
        }
        let text = err.to_string();
        if text.contains("timed out") || text.contains("timeout") {
            UmbraError::NetworkTimeout(text)
        } else {
            UmbraError::Rpc(text)
        }
    }

    async fn wait_receipt(
        pending: alloy::providers::PendingTransactionBuilder<alloy::network::Ethereum>,
    ) -> Result<TxOutcome> {
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| UmbraError::Rpc(format!("failed to fetch receipt: {e}")))?;
        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: Some(receipt.gas_used),
            success: receipt.status(),
        })
    }

    /// Deterministic synthetic receipt for dry-run mode
    fn synthetic_outcome(&self, tag: &str, payload: &[u8]) -> TxOutcome {
        let mut data = Vec::with_capacity(tag.len() + payload.len());
        data.extend_from_slice(tag.as_bytes());
        data.extend_from_slice(payload);
        TxOutcome {
            tx_hash: keccak256(&data),
            block_number: None,
            gas_used: None,
            success: true,
        }
    }

    fn proof_components(
        proofs: &[ZkProof],
    ) -> (
        Vec<[U256; 2]>,
        Vec<[[U256; 2]; 2]>,
        Vec<[U256; 2]>,
        Vec<Vec<U256>>,
    ) {
        let a = proofs.iter().map(|p| p.a).collect();
        let b = proofs.iter().map(|p| p.b).collect();
        let c = proofs.iter().map(|p| p.c).collect();
        let signals = proofs.iter().map(|p| p.public_signals.clone()).collect();
        (a, b, c, signals)
    }
}

#[async_trait]
impl HookApi for HookClient {
    async fn submit_commitment(
        &self,
        pool_key: &PoolKey,
        hash: CommitmentHash,
    ) -> Result<TxOutcome> {
        if self.dry_run {
            debug!(%hash, "dry-run: submitCommitment");
            return Ok(self.synthetic_outcome("submitCommitment", hash.as_slice()));
        }
        let key = Self::to_sol_key(pool_key)?;
        let pending = self
            .instance()?
            .submitCommitment(key, hash)
            .send()
            .await
            .map_err(Self::classify_error)?;
        Self::wait_receipt(pending).await
    }

    async fn submit_commitment_with_proof(
        &self,
        pool_key: &PoolKey,
        hash: CommitmentHash,
        proof: &ZkProof,
    ) -> Result<TxOutcome> {
        if self.dry_run {
            debug!(%hash, "dry-run: submitCommitmentWithProof");
            return Ok(self.synthetic_outcome("submitCommitmentWithProof", hash.as_slice()));
        }
        let key = Self::to_sol_key(pool_key)?;
        let pending = self
            .instance()?
            .submitCommitmentWithProof(
                key,
                hash,
                proof.a,
                proof.b,
                proof.c,
                proof.public_signals.clone(),
            )
            .send()
            .await
            .map_err(Self::classify_error)?;
        Self::wait_receipt(pending).await
    }

    async fn submit_reveal(&self, pool_key: &PoolKey, intent: &SwapIntent) -> Result<TxOutcome> {
        if self.dry_run {
            debug!(hash = %intent.commitment_hash(), "dry-run: submitReveal");
            return Ok(self.synthetic_outcome("submitReveal", &intent.abi_encode_intent()));
        }
        let key = Self::to_sol_key(pool_key)?;
        let pending = self
            .instance()?
            .submitReveal(key, Self::to_sol_intent(intent))
            .send()
            .await
            .map_err(Self::classify_error)?;
        Self::wait_receipt(pending).await
    }

    async fn submit_reveal_for_zk(
        &self,
        pool_key: &PoolKey,
        hash: CommitmentHash,
        intent: &SwapIntent,
    ) -> Result<TxOutcome> {
        if self.dry_run {
            debug!(%hash, "dry-run: submitRevealForZK");
            return Ok(self.synthetic_outcome("submitRevealForZK", hash.as_slice()));
        }
        let key = Self::to_sol_key(pool_key)?;
        let pending = self
            .instance()?
            .submitRevealForZK(key, hash, Self::to_sol_intent(intent))
            .send()
            .await
            .map_err(Self::classify_error)?;
        Self::wait_receipt(pending).await
    }

    async fn reveal_and_batch_execute(
        &self,
        pool_key: &PoolKey,
        hashes: &[CommitmentHash],
    ) -> Result<TxOutcome> {
        if self.dry_run {
            debug!(batch_size = hashes.len(), "dry-run: revealAndBatchExecute");
            let payload: Vec<u8> = hashes.iter().flat_map(|h| h.to_vec()).collect();
            return Ok(self.synthetic_outcome("revealAndBatchExecute", &payload));
        }
        let key = Self::to_sol_key(pool_key)?;
        let pending = self
            .instance()?
            .revealAndBatchExecute(key, hashes.to_vec())
            .send()
            .await
            .map_err(Self::classify_error)?;
        Self::wait_receipt(pending).await
    }

    async fn reveal_and_batch_execute_with_proofs(
        &self,
        pool_key: &PoolKey,
        hashes: &[CommitmentHash],
        proofs: &[ZkProof],
    ) -> Result<TxOutcome> {
        if self.dry_run {
            debug!(
                batch_size = hashes.len(),
                "dry-run: revealAndBatchExecuteWithProofs"
            );
            let payload: Vec<u8> = hashes.iter().flat_map(|h| h.to_vec()).collect();
            return Ok(self.synthetic_outcome("revealAndBatchExecuteWithProofs", &payload));
        }
        let key = Self::to_sol_key(pool_key)?;
        let (a, b, c, signals) = Self::proof_components(proofs);
        let pending = self
            .instance()?
            .revealAndBatchExecuteWithProofs(key, hashes.to_vec(), a, b, c, signals)
            .send()
            .await
            .map_err(Self::classify_error)?;
        Self::wait_receipt(pending).await
    }

    async fn checker(&self, pool_id: B256) -> Result<BatchCheck> {
        if self.dry_run {
            return Ok(BatchCheck {
                can_exec: false,
                exec_payload: Default::default(),
            });
        }
        let ret = self
            .instance()?
            .checker(pool_id)
            .call()
            .await
            .map_err(Self::classify_error)?;
        Ok(BatchCheck {
            can_exec: ret.canExec,
            exec_payload: ret.execPayload,
        })
    }

    async fn get_pending_commitment_count(&self, pool_id: B256) -> Result<u32> {
        if self.dry_run {
            return Ok(0);
        }
        let count = self
            .instance()?
            .getPendingCommitmentCount(pool_id)
            .call()
            .await
            .map_err(Self::classify_error)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn is_commitment_verified(&self, hash: CommitmentHash) -> Result<bool> {
        if self.dry_run {
            return Ok(false);
        }
        self.instance()?
            .isCommitmentVerified(hash)
            .call()
            .await
            .map_err(Self::classify_error)
    }

    async fn get_min_commitments(&self) -> Result<u32> {
        if self.dry_run {
            return Ok(DRY_RUN_MIN_COMMITMENTS);
        }
        let minimum = self
            .instance()?
            .minCommitments()
            .call()
            .await
            .map_err(Self::classify_error)?;
        Ok(u32::try_from(minimum).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn pool_key() -> PoolKey {
        PoolKey::new(
            address!("0x1111111111111111111111111111111111111111"),
            address!("0x2222222222222222222222222222222222222222"),
            3000,
            60,
            address!("0x3333333333333333333333333333333333333333"),
        )
    }

    fn intent() -> SwapIntent {
        SwapIntent {
            intent_id: uuid::Uuid::new_v4(),
            user: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            token_in: address!("0x1111111111111111111111111111111111111111"),
            token_out: address!("0x2222222222222222222222222222222222222222"),
            amount_in: U256::from(1000u64),
            min_amount_out: U256::from(990u64),
            recipient: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            nonce: U256::from(1),
            deadline: U256::from(1_900_000_000u64),
        }
    }

    #[tokio::test]
    async fn dry_run_submit_is_deterministic() {
        let client = HookClient::dry_run(Address::ZERO);
        let hash = intent().commitment_hash();
        let a = client.submit_commitment(&pool_key(), hash).await.unwrap();
        let b = client.submit_commitment(&pool_key(), hash).await.unwrap();
        assert_eq!(a.tx_hash, b.tx_hash);
        assert!(a.success);
    }

    #[tokio::test]
    async fn dry_run_checker_is_never_ready() {
        let client = HookClient::dry_run(Address::ZERO);
        let check = client.checker(B256::ZERO).await.unwrap();
        assert!(!check.can_exec);
    }

    #[test]
    fn sol_key_rejects_out_of_range_fee() {
        let mut key = pool_key();
        key.fee = 1 << 24;
        assert!(HookClient::to_sol_key(&key).is_err());
    }

    #[test]
    fn pure_helpers_delegate_to_domain() {
        let i = intent();
        assert_eq!(HookClient::compute_commitment_hash(&i), i.commitment_hash());
        assert_eq!(HookClient::get_pool_id(&pool_key()), pool_key().pool_id());
    }
}
