//! Pool identity
//!
//! A pool is identified by its key tuple; the 32-byte pool id is derived
//! on demand as keccak256 of the abi-encoded tuple, matching the on-chain
//! derivation exactly.

use alloy::primitives::{keccak256, Address, B256};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};

/// Immutable pool key: (currency0, currency1, fee, tick_spacing, hooks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub currency0: Address,
    pub currency1: Address,
    /// Fee in hundredths of a bip (uint24 on chain)
    pub fee: u32,
    /// Tick spacing (int24 on chain)
    pub tick_spacing: i32,
    /// Hook contract attached to the pool
    pub hooks: Address,
}

impl PoolKey {
    pub fn new(
        currency0: Address,
        currency1: Address,
        fee: u32,
        tick_spacing: i32,
        hooks: Address,
    ) -> Self {
        Self {
            currency0,
            currency1,
            fee,
            tick_spacing,
            hooks,
        }
    }

    /// abi.encode(currency0, currency1, fee, tickSpacing, hooks)
    ///
    /// All five fields are static types, so the encoding is five 32-byte
    /// words. uint24/int24 pad identically to uint32/int32 for in-range
    /// values.
    pub fn abi_encode_key(&self) -> Vec<u8> {
        (
            self.currency0,
            self.currency1,
            self.fee,
            self.tick_spacing,
            self.hooks,
        )
            .abi_encode()
    }

    /// keccak256 of the abi-encoded key tuple
    pub fn pool_id(&self) -> B256 {
        keccak256(self.abi_encode_key())
    }
}

impl std::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} fee={} spacing={}",
            self.currency0, self.currency1, self.fee, self.tick_spacing
        )
    }
}
