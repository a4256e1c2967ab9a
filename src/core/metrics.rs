//! Per-appender delivery counters
//!
//! Dropped events and write failures are never reported to producers; these
//! counters (together with the diagnostic channel) are the only place they
//! become visible.

use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery statistics for a single appender
///
/// # Example
///
/// ```
/// use rust_appender_system::AppenderMetrics;
///
/// let metrics = AppenderMetrics::new();
/// metrics.record_delivered();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.delivered(), 1);
/// assert_eq!(metrics.dropped(), 1);
/// ```
#[derive(Debug)]
pub struct AppenderMetrics {
    /// Events written (sync) or accepted into the queue (async)
    delivered: AtomicU64,

    /// Events rejected by the async discard policy
    dropped: AtomicU64,

    /// Events lost to an I/O error
    write_failures: AtomicU64,

    /// Events still queued when the shutdown timeout expired
    discarded_on_shutdown: AtomicU64,

    /// Completed file rollovers
    rotations: AtomicU64,
}

impl AppenderMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            discarded_on_shutdown: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn discarded_on_shutdown(&self) -> u64 {
        self.discarded_on_shutdown.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Record a delivered event, returning the previous count
    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped event, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_failure(&self) -> u64 {
        self.write_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_discarded_on_shutdown(&self, count: u64) {
        self.discarded_on_shutdown.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rotation(&self) -> u64 {
        self.rotations.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of events lost (dropped, failed or discarded) as a percentage
    ///
    /// Returns 0.0 if nothing has been offered yet.
    pub fn drop_rate(&self) -> f64 {
        let lost = (self.dropped() + self.write_failures() + self.discarded_on_shutdown()) as f64;
        let total = self.delivered() as f64 + self.dropped() as f64 + self.write_failures() as f64;
        if total == 0.0 {
            0.0
        } else {
            (lost / total * 100.0).min(100.0)
        }
    }
}

impl Default for AppenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AppenderMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            delivered: AtomicU64::new(self.delivered()),
            dropped: AtomicU64::new(self.dropped()),
            write_failures: AtomicU64::new(self.write_failures()),
            discarded_on_shutdown: AtomicU64::new(self.discarded_on_shutdown()),
            rotations: AtomicU64::new(self.rotations()),
        }
    }
}
