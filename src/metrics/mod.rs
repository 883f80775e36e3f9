use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::observe::{MetricsSink, Status};

/// In-process [`MetricsSink`] built from relaxed atomic counters.
///
/// Coarse-grained: counters are per sink, not per queue or driver.
#[derive(Debug, Default)]
pub struct Counters {
    published: AtomicU64,
    consumed: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
    dropped_live_delivery: AtomicU64,
    operations: AtomicU64,
    operations_failed: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_total(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn consumed_total(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn acked_total(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }

    pub fn nacked_total(&self) -> u64 {
        self.nacked.load(Ordering::Relaxed)
    }

    pub fn dropped_live_delivery_total(&self) -> u64 {
        self.dropped_live_delivery.load(Ordering::Relaxed)
    }

    pub fn operations_total(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    pub fn operations_failed_total(&self) -> u64 {
        self.operations_failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> String {
        // Prometheus-style text without HELP/TYPE lines.
        format!(
            "mqkit_published {}\nmqkit_consumed {}\nmqkit_acked {}\nmqkit_nacked {}\nmqkit_dropped_live_delivery {}\nmqkit_operations {}\nmqkit_operations_failed {}\n",
            self.published_total(),
            self.consumed_total(),
            self.acked_total(),
            self.nacked_total(),
            self.dropped_live_delivery_total(),
            self.operations_total(),
            self.operations_failed_total(),
        )
    }
}

impl MetricsSink for Counters {
    #[inline]
    fn operation(&self, _driver: &str, _operation: &str, _queue: &str, status: Status, _elapsed: Duration) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        if status == Status::Error {
            self.operations_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    fn published(&self, _driver: &str) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn consumed(&self, _driver: &str) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn acked(&self, _driver: &str) {
        self.acked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn nacked(&self, _driver: &str) {
        self.nacked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn dropped(&self, _driver: &str, _queue: &str) {
        self.dropped_live_delivery.fetch_add(1, Ordering::Relaxed);
    }
}
