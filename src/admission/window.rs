//! Per-destination admission window.
//!
//! # Responsibilities
//! - Hold the counters of the current observation period
//! - Hold the adaptive window size
//! - Apply resets, grow and shrink with atomic operations only
//!
//! # Design Decisions
//! - One `WindowState` per destination, shared via `Arc`
//! - Fields are individually consistent; no cross-field atomicity
//! - `record_start == 0` means no trouble seen since the last reset

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::WindowPolicy;

/// Adaptive window of a single destination.
#[derive(Debug)]
pub struct WindowState {
    /// Time (ms since epoch) of the first failure or slow response since the
    /// last reset; 0 when unset.
    record_start: AtomicU64,
    /// Failed requests since the last reset.
    fail_count: AtomicU64,
    /// Requests counted since the last reset, rejected ones included.
    request_count: AtomicU64,
    /// Slow responses since the last reset.
    slow_response_count: AtomicU64,
    /// Current admission limit.
    max_request: AtomicU64,
    /// Periods reset over the window's lifetime.
    resets: AtomicU64,
}

/// Point-in-time copy of a window, for inspection and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSnapshot {
    pub record_start: u64,
    pub fail_count: u64,
    pub request_count: u64,
    pub slow_response_count: u64,
    pub max_request: u64,
    pub resets: u64,
}

/// Direction of a window change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Grow,
    Shrink,
}

impl Adjustment {
    pub fn as_str(self) -> &'static str {
        match self {
            Adjustment::Grow => "grow",
            Adjustment::Shrink => "shrink",
        }
    }
}

impl WindowState {
    /// Create a window starting at `initial` with all counters cleared.
    pub fn new(initial: u64) -> Self {
        Self {
            record_start: AtomicU64::new(0),
            fail_count: AtomicU64::new(0),
            request_count: AtomicU64::new(0),
            slow_response_count: AtomicU64::new(0),
            max_request: AtomicU64::new(initial),
            resets: AtomicU64::new(0),
        }
    }

    /// Count a request and return the count before it.
    pub fn next_request(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Current admission limit.
    pub fn max_request(&self) -> u64 {
        self.max_request.load(Ordering::Relaxed)
    }

    /// Return the start of the current period if it ended before `now`.
    pub fn expired_period(&self, now: u64, clear_period_ms: u64) -> Option<u64> {
        let start = self.record_start.load(Ordering::Acquire);
        (start > 0 && now > start.saturating_add(clear_period_ms)).then_some(start)
    }

    /// Reset the period that started at `observed_start`.
    ///
    /// Only the caller that clears `record_start` resets the counters, so
    /// concurrent observers of the same expired period reset it once.
    /// `req_count` is the resetting request's pre-count: requests up to and
    /// including it are dropped, later ones counted by other callers survive.
    pub fn try_reset(&self, observed_start: u64, req_count: u64, floor: u64) -> bool {
        if self
            .record_start
            .compare_exchange(observed_start, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.fail_count.store(0, Ordering::Relaxed);
        let counted = req_count.saturating_add(1);
        let _ = self
            .request_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_sub(counted))
            });
        self.slow_response_count.store(0, Ordering::Relaxed);
        self.max_request.store(floor, Ordering::Relaxed);
        self.resets.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Record a slow response for a request started at `started_at`.
    pub fn record_slow_response(&self, started_at: u64) {
        self.slow_response_count.fetch_add(1, Ordering::Relaxed);
        self.mark_trouble(started_at);
    }

    /// Record a failed request started at `started_at`.
    pub fn record_failure(&self, started_at: u64) {
        self.fail_count.fetch_add(1, Ordering::Relaxed);
        self.mark_trouble(started_at);
    }

    // First observation wins.
    fn mark_trouble(&self, started_at: u64) {
        let _ = self.record_start.compare_exchange(
            0,
            started_at,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Decide and apply the window change after a completed request.
    ///
    /// `req_count` is the pre-increment request count of that request.
    /// Returns `(direction, old, new)` when the window moved.
    pub fn adjust(&self, policy: &WindowPolicy, req_count: u64) -> Option<(Adjustment, u64, u64)> {
        let slow = self.slow_response_count.load(Ordering::Relaxed);
        let failed = self.fail_count.load(Ordering::Relaxed);

        if slow > policy.slow_response_threshold {
            return self.shrink(policy).map(|(old, new)| (Adjustment::Shrink, old, new));
        }

        if req_count > 0 && failed as f64 / req_count as f64 > policy.fail_ratio_threshold {
            return self.shrink(policy).map(|(old, new)| (Adjustment::Shrink, old, new));
        }

        if slow == 0 && failed == 0 {
            return self.grow(policy).map(|(old, new)| (Adjustment::Grow, old, new));
        }

        None
    }

    /// Widen by one step unless already at or past the ceiling.
    pub fn grow(&self, policy: &WindowPolicy) -> Option<(u64, u64)> {
        let old = self.max_request();
        if old >= policy.max_request {
            return None;
        }
        let new = policy.grown(old);
        self.swap_window(old, new)
    }

    /// Narrow by one step unless already at or below the floor.
    pub fn shrink(&self, policy: &WindowPolicy) -> Option<(u64, u64)> {
        let old = self.max_request();
        if old <= policy.min_request {
            return None;
        }
        let new = policy.shrunk(old);
        self.swap_window(old, new)
    }

    // A concurrent adjustment that got there first wins; this one is dropped.
    fn swap_window(&self, old: u64, new: u64) -> Option<(u64, u64)> {
        if old == new {
            return None;
        }
        self.max_request
            .compare_exchange(old, new, Ordering::Relaxed, Ordering::Relaxed)
            .ok()
            .map(|_| (old, new))
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            record_start: self.record_start.load(Ordering::Acquire),
            fail_count: self.fail_count.load(Ordering::Relaxed),
            request_count: self.request_count.load(Ordering::Relaxed),
            slow_response_count: self.slow_response_count.load(Ordering::Relaxed),
            max_request: self.max_request(),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> WindowPolicy {
        WindowPolicy::default()
    }

    #[test]
    fn test_next_request_returns_pre_increment() {
        let window = WindowState::new(1000);
        assert_eq!(window.next_request(), 0);
        assert_eq!(window.next_request(), 1);
        assert_eq!(window.snapshot().request_count, 2);
    }

    #[test]
    fn test_grow_sequence_overshoots_ceiling_once() {
        let window = WindowState::new(1000);
        let mut seen = Vec::new();
        while let Some((_, new)) = window.grow(&policy()) {
            seen.push(new);
        }
        assert_eq!(
            seen,
            vec![1300, 1690, 2197, 2856, 3712, 4825, 6272, 8153, 10598]
        );
        assert_eq!(window.max_request(), 10598);
    }

    #[test]
    fn test_shrink_stops_at_floor() {
        let window = WindowState::new(1000);
        assert_eq!(window.shrink(&policy()), None);

        let window = WindowState::new(1183);
        assert_eq!(window.shrink(&policy()), Some((1183, 828)));
        assert_eq!(window.shrink(&policy()), None);
    }

    #[test]
    fn test_first_trouble_sets_record_start() {
        let window = WindowState::new(1000);
        window.record_failure(500);
        window.record_slow_response(900);
        let snap = window.snapshot();
        assert_eq!(snap.record_start, 500);
        assert_eq!(snap.fail_count, 1);
        assert_eq!(snap.slow_response_count, 1);
    }

    #[test]
    fn test_reset_happens_once_per_period() {
        let window = WindowState::new(1000);
        window.grow(&policy());
        window.next_request();
        window.record_failure(100);

        assert_eq!(window.expired_period(5_100, 5_000), None);
        let start = window.expired_period(5_101, 5_000).unwrap();
        let req_count = window.next_request();

        assert!(window.try_reset(start, req_count, 1000));
        assert!(!window.try_reset(start, req_count, 1000));
        assert_eq!(
            window.snapshot(),
            WindowSnapshot {
                record_start: 0,
                fail_count: 0,
                request_count: 0,
                slow_response_count: 0,
                max_request: 1000,
                resets: 1,
            }
        );
    }

    #[test]
    fn test_reset_keeps_requests_counted_after_the_winner() {
        let window = WindowState::new(1000);
        window.record_failure(100);
        let winner = window.next_request();
        // Two more callers count themselves before the winner resets.
        window.next_request();
        window.next_request();

        assert!(window.try_reset(100, winner, 1000));
        assert_eq!(window.snapshot().request_count, 2);
    }

    #[test]
    fn test_adjust_skips_ratio_on_zero_count() {
        let window = WindowState::new(2000);
        window.record_failure(1);
        assert_eq!(window.adjust(&policy(), 0), None);
        assert_eq!(window.max_request(), 2000);
    }

    #[test]
    fn test_adjust_holds_with_minor_trouble() {
        let window = WindowState::new(2000);
        window.record_failure(1);
        // 1 / 4 = 0.25 is under the threshold
        assert_eq!(window.adjust(&policy(), 4), None);
        assert_eq!(window.max_request(), 2000);
    }
}
