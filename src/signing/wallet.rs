use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use tracing::info;

use crate::error::{Result, UmbraError};

/// Wallet for signing hook transactions
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a private key hex string
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        let key_hex = private_key.trim().trim_start_matches("0x");

        let signer = key_hex
            .parse::<PrivateKeySigner>()
            .map_err(|e| UmbraError::Wallet(format!("Invalid private key: {e}")))?
            .with_chain_id(Some(chain_id));

        info!("Wallet initialized: {}", signer.address());

        Ok(Self { signer, chain_id })
    }

    /// Create a wallet from environment variable
    pub fn from_env(chain_id: u64) -> Result<Self> {
        let private_key = std::env::var("UMBRA_PRIVATE_KEY")
            .or_else(|_| std::env::var("PRIVATE_KEY"))
            .map_err(|_| {
                UmbraError::Wallet(
                    "UMBRA_PRIVATE_KEY or PRIVATE_KEY environment variable not set".to_string(),
                )
            })?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// Throwaway wallet for dry-run sessions
    pub fn ephemeral(chain_id: u64) -> Self {
        Self {
            signer: PrivateKeySigner::random().with_chain_id(Some(chain_id)),
            chain_id,
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a 32-byte hash
    pub async fn sign_hash(&self, hash: B256) -> Result<Signature> {
        self.signer
            .sign_hash(&hash)
            .await
            .map_err(|e| UmbraError::Signature(format!("Failed to sign hash: {e}")))
    }

    /// Underlying signer, for building a wallet-backed provider
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
