//! Execution history and aggregate statistics

use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One batch-execute attempt that reached its terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub pool_id: B256,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub batch_size: usize,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregates over the execution history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    /// Sum of batch sizes across successful batches
    pub total_swaps: u64,
    pub average_gas_used: f64,
}

impl ExecutionStats {
    pub fn from_history(history: &[ExecutionRecord]) -> Self {
        let total_batches = history.len();
        let successful_batches = history.iter().filter(|r| r.success).count();
        let failed_batches = total_batches - successful_batches;
        let total_swaps = history
            .iter()
            .filter(|r| r.success)
            .map(|r| r.batch_size as u64)
            .sum();

        let gas_samples: Vec<u64> = history.iter().filter_map(|r| r.gas_used).collect();
        let average_gas_used = if gas_samples.is_empty() {
            0.0
        } else {
            gas_samples.iter().sum::<u64>() as f64 / gas_samples.len() as f64
        };

        Self {
            total_batches,
            successful_batches,
            failed_batches,
            total_swaps,
            average_gas_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool, batch_size: usize, gas: Option<u64>) -> ExecutionRecord {
        ExecutionRecord {
            pool_id: B256::ZERO,
            tx_hash: None,
            block_number: None,
            gas_used: gas,
            batch_size,
            success,
            error: None,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn stats_aggregate_over_history() {
        let history = vec![
            record(true, 3, Some(100_000)),
            record(true, 2, Some(120_000)),
            record(false, 4, None),
        ];
        let stats = ExecutionStats::from_history(&history);
        assert_eq!(stats.total_batches, 3);
        assert_eq!(stats.successful_batches, 2);
        assert_eq!(stats.failed_batches, 1);
        assert_eq!(stats.total_swaps, 5);
        assert!((stats.average_gas_used - 110_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_history_yields_zeroes() {
        let stats = ExecutionStats::from_history(&[]);
        assert_eq!(stats.total_batches, 0);
        assert_eq!(stats.average_gas_used, 0.0);
    }
}
