//! Counters for mutation outcomes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStatsSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    /// Optimistic patches reverted after a failed write
    pub rolled_back: u64,
    pub keys_invalidated: u64,
}

/// Thread-safe statistics collector; clones share counters
#[derive(Clone, Default)]
pub struct MutationStats {
    succeeded: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    rolled_back: Arc<AtomicU64>,
    keys_invalidated: Arc<AtomicU64>,
}

impl MutationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, invalidated: usize) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.keys_invalidated
            .fetch_add(invalidated as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MutationStatsSnapshot {
        MutationStatsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            keys_invalidated: self.keys_invalidated.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.rolled_back.store(0, Ordering::Relaxed);
        self.keys_invalidated.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = MutationStats::new();
        stats.record_success(4);
        stats.record_success(1);
        stats.record_failure();
        stats.record_rollback();

        assert_eq!(
            stats.snapshot(),
            MutationStatsSnapshot {
                succeeded: 2,
                failed: 1,
                rolled_back: 1,
                keys_invalidated: 5,
            }
        );
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = MutationStats::new();
        let other = stats.clone();
        other.record_failure();

        assert_eq!(stats.snapshot().failed, 1);

        stats.reset();
        assert_eq!(other.snapshot(), MutationStatsSnapshot::default());
    }
}
