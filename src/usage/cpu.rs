//! CPU rate tracking from cgroup v2 cpu.stat
//!
//! cpu.stat only exposes a cumulative counter (`usage_usec`). To report how
//! busy the container is *right now* we keep the previous sample and divide
//! the counter delta by the wall-clock delta:
//!
//! ```text
//! TIME ──────────────────────────────────────────►
//!
//!   previous sample                        this sample
//!       │                                      │
//!       ▼                                      ▼
//!       ├──────────elapsed (1.0 sec)──────────┤
//!
//!   usage_usec: 5_000_000 ──────────────► 7_000_000
//!
//!   rate = 2_000_000 / (1.0 * 1_000_000) = 2.0 CPUs busy
//! ```
//!
//! The result lies in `[0, N]` where N is the number of CPUs available to
//! the container.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use tracing::debug;

use crate::cgroups::{CgroupError, CgroupReader};

const USEC_PER_SEC: f64 = 1_000_000.0;

/// One point-in-time reading of the cumulative CPU counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSample {
    /// When the counter was read
    pub at: Instant,
    /// Cumulative CPU time consumed (microseconds)
    pub usage_usec: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// CpuRateTracker
// ═══════════════════════════════════════════════════════════════════════════
// WHAT IT IS:
//   A single slot holding the most recent CpuSample, shared by every caller.
//
// SHARED WINDOW:
//   There is one tracker per process, not per caller. Two callers polling
//   at the same time each see the delta since the *other's* latest call.
//   The mutex only makes the read-modify-write of the slot atomic; it does
//   not give each caller its own window.
//
// EXAMPLE:
//   let tracker = CpuRateTracker::new();
//   tracker.sample(&cgroup)?;   // 0.0 (no previous sample)
//   tracker.sample(&cgroup)?;   // CPUs busy since the first call
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct CpuRateTracker {
    last: Mutex<Option<CpuSample>>,
}

impl CpuRateTracker {
    /// Create a tracker with no previous sample
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // sample(cgroup) - Read cpu.stat and compute the current rate
    // ═══════════════════════════════════════════════════════════════════════
    // RETURNS:
    //   Ok(0.0)  → cpu.stat missing (state untouched) or first sample
    //   Ok(rate) → CPUs busy since the previous sample
    //   Err(_)   → cpu.stat exists but could not be read or parsed
    // ═══════════════════════════════════════════════════════════════════════
    pub fn sample(&self, cgroup: &CgroupReader) -> Result<f64, CgroupError> {
        if !cgroup.has_cpu_stat() {
            debug!(root = %cgroup.root().display(), "cpu.stat not available, reporting 0");
            return Ok(0.0);
        }

        let stats = cgroup.cpu_stats()?;
        Ok(self.observe(stats.usage_usec, Instant::now()))
    }

    /// Record a counter reading taken at `at` and return the rate since the
    /// previous reading (0.0 if there is none)
    ///
    /// The slot is overwritten whether or not a rate could be computed.
    pub fn observe(&self, usage_usec: u64, at: Instant) -> f64 {
        let current = CpuSample { at, usage_usec };

        // The slot only holds plain scalars, so a poisoned lock is still usable
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let rate = match *last {
            Some(previous) => rate_between(previous, current),
            None => 0.0,
        };
        *last = Some(current);

        rate
    }

    /// The most recent sample, if any
    pub fn last_sample(&self) -> Option<CpuSample> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget the previous sample; the next call reports 0.0
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// CPU-microseconds consumed per wall-clock microsecond between two samples
///
/// A counter that went backwards (cgroup recreated) or a zero interval
/// yields 0.0.
fn rate_between(previous: CpuSample, current: CpuSample) -> f64 {
    let elapsed = current.at.saturating_duration_since(previous.at);
    if elapsed.is_zero() {
        return 0.0;
    }

    let used_usec = current.usage_usec.saturating_sub(previous.usage_usec) as f64;
    used_usec / (elapsed.as_secs_f64() * USEC_PER_SEC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_observation_is_zero() {
        let tracker = CpuRateTracker::new();
        assert_eq!(tracker.observe(5_000_000, Instant::now()), 0.0);
        assert!(tracker.last_sample().is_some());
    }

    #[test]
    fn test_two_cpus_busy_for_one_second() {
        let tracker = CpuRateTracker::new();
        let start = Instant::now();

        tracker.observe(5_000_000, start);
        let rate = tracker.observe(7_000_000, start + Duration::from_secs(1));

        assert_eq!(rate, 2.0);
    }

    #[test]
    fn test_window_is_since_latest_call() {
        let tracker = CpuRateTracker::new();
        let start = Instant::now();

        tracker.observe(0, start);
        tracker.observe(1_000_000, start + Duration::from_secs(1));
        // Second caller: delta is since the previous observe, not the first one
        let rate = tracker.observe(1_500_000, start + Duration::from_secs(2));

        assert_eq!(rate, 0.5);
    }

    #[test]
    fn test_counter_reset_and_zero_interval() {
        let tracker = CpuRateTracker::new();
        let start = Instant::now();

        tracker.observe(9_000_000, start);
        assert_eq!(tracker.observe(1_000, start + Duration::from_secs(1)), 0.0);
        assert_eq!(tracker.observe(2_000, start + Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_reset() {
        let tracker = CpuRateTracker::new();
        let start = Instant::now();

        tracker.observe(0, start);
        tracker.reset();
        assert!(tracker.last_sample().is_none());
        assert_eq!(tracker.observe(1_000_000, start + Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_missing_cpu_stat_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cgroup = CgroupReader::new(dir.path());
        let tracker = CpuRateTracker::new();

        assert_eq!(tracker.sample(&cgroup).unwrap(), 0.0);
        assert!(tracker.last_sample().is_none());

        // First real read after the gap still has nothing to diff against
        std::fs::write(dir.path().join("cpu.stat"), "usage_usec 123456\n").unwrap();
        assert_eq!(tracker.sample(&cgroup).unwrap(), 0.0);
        assert_eq!(tracker.last_sample().map(|s| s.usage_usec), Some(123456));
    }

    #[test]
    fn test_malformed_cpu_stat_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cpu.stat"), "user_usec 1\n").unwrap();
        let tracker = CpuRateTracker::new();

        assert!(tracker.sample(&CgroupReader::new(dir.path())).is_err());
        assert!(tracker.last_sample().is_none());
    }
}
