//! Coordinator configuration

use serde::{Deserialize, Serialize};

/// Strategy for reconciling divergent slippage preferences into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    #[default]
    Median,
    Mean,
    Min,
    Max,
}

impl ConflictResolution {
    /// Aggregate preferred slippage values. Median of an even count is the
    /// lower-middle element; mean truncates to integer.
    pub fn resolve(&self, values: &[u32]) -> Option<u32> {
        if values.is_empty() {
            return None;
        }
        match self {
            ConflictResolution::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_unstable();
                let n = sorted.len();
                let idx = if n % 2 == 0 { n / 2 - 1 } else { n / 2 };
                Some(sorted[idx])
            }
            ConflictResolution::Mean => {
                let sum: u64 = values.iter().map(|v| *v as u64).sum();
                Some((sum / values.len() as u64) as u32)
            }
            ConflictResolution::Min => values.iter().copied().min(),
            ConflictResolution::Max => values.iter().copied().max(),
        }
    }
}

/// Batch coordinator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Minimum distinct ready agents required to arm the countdown
    pub quorum: usize,
    /// Minimum sum of pending commitments across ready agents required to
    /// fire
    pub min_total_commitments: u32,
    /// Delay between quorum being met and firing
    pub countdown_ms: u64,
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            quorum: 2,
            min_total_commitments: 2,
            countdown_ms: 30_000,
            conflict_resolution: ConflictResolution::Median,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_takes_middle() {
        assert_eq!(
            ConflictResolution::Median.resolve(&[100, 30, 50]),
            Some(50)
        );
    }

    #[test]
    fn median_even_takes_lower_middle() {
        assert_eq!(
            ConflictResolution::Median.resolve(&[10, 40, 20, 30]),
            Some(20)
        );
    }

    #[test]
    fn mean_truncates() {
        assert_eq!(ConflictResolution::Mean.resolve(&[30, 70]), Some(50));
        assert_eq!(ConflictResolution::Mean.resolve(&[30, 31]), Some(30));
    }

    #[test]
    fn min_max_and_empty() {
        assert_eq!(ConflictResolution::Min.resolve(&[30, 70, 50]), Some(30));
        assert_eq!(ConflictResolution::Max.resolve(&[30, 70, 50]), Some(70));
        assert_eq!(ConflictResolution::Median.resolve(&[]), None);
    }
}
