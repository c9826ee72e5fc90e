//! Lock-free booking outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the booking counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Attempts that booked a ticket.
    pub successful: u64,
    /// Attempts that failed for any reason.
    pub failed: u64,
}

impl MetricsSnapshot {
    /// Total number of attempts recorded.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.successful + self.failed
    }
}

/// Success and failure counters shared by every worker.
///
/// Reads taken while workers are still running are valid but not final; the
/// authoritative read is the one taken after the pool has finished.
#[derive(Debug, Default)]
pub struct BookingMetrics {
    successful: AtomicU64,
    failed: AtomicU64,
}

impl BookingMetrics {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successful attempt.
    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed attempt.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Read both counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            successful: self.successful.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }
}
