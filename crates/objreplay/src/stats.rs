//! Replay counters.
//!
//! The replayer records one decision per consumed record plus the byte
//! volume of copied objects and the number of operation retries. Counters
//! are atomic so concurrent copy tasks can update them without locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::replay::Decision;

/// Atomic counters updated by the replay pipeline.
#[derive(Debug, Default)]
pub struct ReplayStats {
    copied: AtomicU64,
    in_dst: AtomicU64,
    skipped: AtomicU64,
    excluded: AtomicU64,
    not_in_src: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
    retries: AtomicU64,
}

impl ReplayStats {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decision for one consumed record.
    pub fn record(&self, decision: Decision) {
        let counter = match decision {
            Decision::Copied => &self.copied,
            Decision::InDst => &self.in_dst,
            Decision::Skipped => &self.skipped,
            Decision::Excluded => &self.excluded,
            Decision::NotInSrc => &self.not_in_src,
            Decision::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the byte volume of a copied object.
    pub fn add_bytes(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record one retried storage operation.
    pub fn add_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            copied: self.copied.load(Ordering::Relaxed),
            in_dst: self.in_dst.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            excluded: self.excluded.load(Ordering::Relaxed),
            not_in_src: self.not_in_src.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view of the replay counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Objects copied to the destination.
    pub copied: u64,
    /// Objects already present in the destination.
    pub in_dst: u64,
    /// Objects skipped because they are not visible.
    pub skipped: u64,
    /// Objects excluded by the exclusion list or size limit.
    pub excluded: u64,
    /// Objects missing from the source.
    pub not_in_src: u64,
    /// Objects that exhausted their retries.
    pub failed: u64,
    /// Total bytes copied.
    pub bytes: u64,
    /// Total retried storage operations.
    pub retries: u64,
}

impl StatsSnapshot {
    /// Total number of records that received a decision.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.copied + self.in_dst + self.skipped + self.excluded + self.not_in_src + self.failed
    }

    /// Render the end-of-run summary line for the given elapsed time.
    #[must_use]
    pub fn summary(&self, elapsed: Duration) -> String {
        let secs = elapsed.as_secs_f64().max(f64::EPSILON);
        #[allow(clippy::cast_precision_loss)]
        let rate = self.total() as f64 / secs;
        #[allow(clippy::cast_precision_loss)]
        let throughput = self.bytes as f64 / 1024.0 / 1024.0 / secs;
        format!(
            "processed {} content objects in {:.1}sec ({:.1} obj/sec, {:.1}MB/sec) \
             - {} copied - {} in dst - {} skipped - {} excluded - {} not found - {} failed",
            self.total(),
            secs,
            rate,
            throughput,
            self.copied,
            self.in_dst,
            self.skipped,
            self.excluded,
            self.not_in_src,
            self.failed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let snapshot = ReplayStats::new().snapshot();
        assert_eq!(snapshot.total(), 0);
        assert_eq!(snapshot.bytes, 0);
        assert_eq!(snapshot.retries, 0);
    }

    #[test]
    fn test_record_each_decision() {
        let stats = ReplayStats::new();
        stats.record(Decision::Copied);
        stats.record(Decision::InDst);
        stats.record(Decision::Skipped);
        stats.record(Decision::Excluded);
        stats.record(Decision::NotInSrc);
        stats.record(Decision::Failed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.copied, 1);
        assert_eq!(snapshot.in_dst, 1);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.excluded, 1);
        assert_eq!(snapshot.not_in_src, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.total(), 6);
    }

    #[test]
    fn test_decisions_partition_the_total() {
        let stats = ReplayStats::new();
        for _ in 0..3 {
            stats.record(Decision::Copied);
        }
        for _ in 0..2 {
            stats.record(Decision::Excluded);
        }

        let snapshot = stats.snapshot();
        assert_eq!(
            snapshot.total(),
            snapshot.copied
                + snapshot.in_dst
                + snapshot.skipped
                + snapshot.excluded
                + snapshot.not_in_src
                + snapshot.failed
        );
    }

    #[test]
    fn test_add_bytes_and_retries() {
        let stats = ReplayStats::new();
        stats.add_bytes(1024);
        stats.add_bytes(512);
        stats.add_retry();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.bytes, 1536);
        assert_eq!(snapshot.retries, 1);
    }

    #[test]
    fn test_summary_format() {
        let stats = ReplayStats::new();
        stats.record(Decision::Copied);
        stats.record(Decision::InDst);
        stats.add_bytes(4);

        let summary = stats.snapshot().summary(Duration::from_secs(2));
        assert!(summary.starts_with("processed 2 content objects"));
        assert!(summary.contains("1 copied"));
        assert!(summary.contains("1 in dst"));
        assert!(summary.contains("0 skipped"));
        assert!(summary.contains("0 excluded"));
        assert!(summary.contains("0 not found"));
        assert!(summary.contains("0 failed"));
    }

    #[test]
    fn test_summary_handles_zero_elapsed() {
        let stats = ReplayStats::new();
        stats.record(Decision::Copied);

        // Must not divide by zero.
        let summary = stats.snapshot().summary(Duration::ZERO);
        assert!(summary.contains("1 copied"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = ReplayStats::new();
        stats.record(Decision::Copied);
        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert!(json.contains("\"copied\":1"));
    }
}
