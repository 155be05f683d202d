//! Intent nonce allocation
//!
//! Intent nonces must be unique per (pool, user) forever. Allocation is
//! monotonic per pool, seeded from the wall clock so a restarted process
//! without persisted state cannot collide with its own past allocations.

use std::collections::HashMap;

use alloy::primitives::{B256, U256};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

/// Atomic per-pool nonce allocator
#[derive(Default)]
pub struct NonceAllocator {
    next: Mutex<HashMap<B256, u64>>,
}

impl NonceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next nonce for a pool
    pub async fn allocate(&self, pool_id: B256) -> U256 {
        let mut next = self.next.lock().await;
        let entry = next
            .entry(pool_id)
            .or_insert_with(|| Utc::now().timestamp_micros().max(0) as u64);
        let nonce = *entry;
        *entry += 1;
        debug!(%pool_id, nonce, "nonce allocated");
        U256::from(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nonces_are_strictly_increasing_per_pool() {
        let allocator = NonceAllocator::new();
        let pool = B256::repeat_byte(0x01);
        let a = allocator.allocate(pool).await;
        let b = allocator.allocate(pool).await;
        let c = allocator.allocate(pool).await;
        assert!(a < b && b < c);
        assert_eq!(b - a, U256::from(1u64));
    }

    #[tokio::test]
    async fn pools_have_independent_sequences() {
        let allocator = NonceAllocator::new();
        let p1 = B256::repeat_byte(0x01);
        let p2 = B256::repeat_byte(0x02);
        let a1 = allocator.allocate(p1).await;
        let a2 = allocator.allocate(p2).await;
        let b1 = allocator.allocate(p1).await;
        assert_eq!(b1 - a1, U256::from(1u64));
        // Second pool starts its own clock-seeded sequence
        assert!(a2 >= a1);
    }
}
