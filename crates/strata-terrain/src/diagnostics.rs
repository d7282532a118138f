//! Rate limiting for anomalies met on the sampling path.
//!
//! Sampling runs per column on many threads; a broken reference hit once per
//! column would otherwise flood the log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Latch that opens at most once per interval, shared across threads.
#[derive(Debug)]
pub struct WarnLatch {
    origin: Instant,
    interval_ms: u64,
    /// Milliseconds since `origin` of the last flip, offset by one so that
    /// zero means "never flipped".
    last: AtomicU64,
    suppressed: AtomicU64,
}

impl WarnLatch {
    /// Create a latch that flips at most once per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval_ms: interval.as_millis() as u64,
            last: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Returns `true` if the caller may emit its warning now.
    ///
    /// Exactly one of several racing callers wins each interval; the others
    /// are counted as suppressed.
    pub fn flip(&self) -> bool {
        let now = self.origin.elapsed().as_millis() as u64 + 1;
        let last = self.last.load(Ordering::Relaxed);
        if last != 0 && now.saturating_sub(last) < self.interval_ms {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if self
            .last
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            true
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Take the number of warnings suppressed since the last call.
    pub fn take_suppressed(&self) -> u64 {
        self.suppressed.swap(0, Ordering::Relaxed)
    }
}
