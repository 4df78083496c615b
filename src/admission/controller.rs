//! Admission controller.
//!
//! # Responsibilities
//! - Own the address → window map
//! - Admit or reject each request against its destination's window
//! - Observe outcome and latency of admitted requests
//! - Grow or shrink the window from what was observed
//!
//! # Request Flow
//! ```text
//! admit():    count request → reset expired period | reject if window exhausted
//! next():     delegated call, timed with the controller clock
//! complete(): record slow/failed → adjust window
//! ```
//!
//! No lock is held between `admit` and `complete`; both phases are plain
//! atomic updates on the shared window.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use crate::admission::clock::{Clock, SystemClock};
use crate::admission::error::{AdmissionError, AdmissionResult};
use crate::admission::types::{Invocation, Outcome};
use crate::admission::window::{WindowSnapshot, WindowState};
use crate::config::{validate_policy, ValidationError, WindowPolicy};
use crate::observability::metrics;

/// Adaptive per-destination admission controller.
///
/// Construct once and share via `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct AdmissionController {
    windows: DashMap<String, Arc<WindowState>>,
    policy: ArcSwap<WindowPolicy>,
    clock: Arc<dyn Clock>,
}

/// An admitted request awaiting its outcome.
///
/// Dropping a permit without [`AdmissionController::complete`] leaves the
/// request counted but unobserved.
#[derive(Debug)]
#[must_use = "pass the permit to AdmissionController::complete once the call finishes"]
pub struct Permit {
    address: String,
    window: Arc<WindowState>,
    req_count: u64,
    started_at: u64,
}

impl Permit {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Request count observed before this request was counted.
    pub fn request_count(&self) -> u64 {
        self.req_count
    }
}

impl AdmissionController {
    /// Create a controller on the system clock.
    pub fn new(policy: WindowPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: WindowPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            policy: ArcSwap::from_pointee(policy),
            clock,
        }
    }

    /// The policy currently in force.
    pub fn policy(&self) -> Arc<WindowPolicy> {
        self.policy.load_full()
    }

    /// Replace the policy.
    ///
    /// Existing windows keep their size; a new floor applies to new
    /// destinations and to the next reset of existing ones. An invalid
    /// policy is rejected and the current one stays in force.
    pub fn update_policy(&self, policy: WindowPolicy) -> Result<(), Vec<ValidationError>> {
        if let Err(errors) = validate_policy(&policy) {
            tracing::warn!(
                errors = errors.len(),
                "Window policy rejected, keeping current policy"
            );
            return Err(errors);
        }
        tracing::info!(
            min_request = policy.min_request,
            max_request = policy.max_request,
            clear_period_ms = policy.clear_period_ms,
            "Window policy updated"
        );
        self.policy.store(Arc::new(policy));
        Ok(())
    }

    /// Run `next` under admission control for `address`.
    ///
    /// Returns `Err(AdmissionError::Busy)` without calling `next` when the
    /// window is exhausted. Otherwise returns whatever `next` produced,
    /// failures included.
    pub fn handle<R, F, O>(&self, address: &str, request: R, next: F) -> AdmissionResult<O>
    where
        R: Invocation,
        F: FnOnce(R) -> O,
        O: Outcome,
    {
        let permit = self.admit(address, &request)?;
        let outcome = next(request);
        self.complete(permit, outcome.is_failure());
        Ok(outcome)
    }

    /// Async variant of [`handle`](Self::handle).
    pub async fn handle_async<R, F, Fut, O>(
        &self,
        address: &str,
        request: R,
        next: F,
    ) -> AdmissionResult<O>
    where
        R: Invocation,
        F: FnOnce(R) -> Fut,
        Fut: Future<Output = O>,
        O: Outcome,
    {
        let permit = self.admit(address, &request)?;
        let outcome = next(request).await;
        self.complete(permit, outcome.is_failure());
        Ok(outcome)
    }

    /// First phase: count the request and decide whether it may proceed.
    pub fn admit<R>(&self, address: &str, request: &R) -> AdmissionResult<Permit>
    where
        R: Invocation + ?Sized,
    {
        let policy = self.policy.load();
        let now = self.clock.now_millis();
        let window = self.window(address);
        let req_count = window.next_request();

        if let Some(period_start) = window.expired_period(now, policy.clear_period_ms) {
            if window.try_reset(period_start, req_count, policy.min_request) {
                tracing::debug!(
                    address = %address,
                    period_start,
                    window = policy.min_request,
                    "Observation period expired, window reset"
                );
                metrics::record_reset(address);
                metrics::record_window_size(address, policy.min_request);
            }
        } else {
            let max_request = window.max_request();
            if req_count > max_request {
                let request = request.describe();
                tracing::info!(
                    address = %address,
                    request = %request,
                    max_request,
                    "Request rejected, window exhausted"
                );
                metrics::record_rejected(address);
                return Err(AdmissionError::Busy {
                    address: address.to_owned(),
                    request,
                });
            }
        }

        metrics::record_admitted(address);
        Ok(Permit {
            address: address.to_owned(),
            window,
            req_count,
            started_at: now,
        })
    }

    /// Second phase: record how the admitted call went and adapt the window.
    pub fn complete(&self, permit: Permit, failed: bool) {
        let policy = self.policy.load();
        let elapsed = self.clock.now_millis().saturating_sub(permit.started_at);
        metrics::record_duration(&permit.address, elapsed);

        if elapsed > policy.slow_response_ms {
            permit.window.record_slow_response(permit.started_at);
        }
        if failed {
            permit.window.record_failure(permit.started_at);
        }

        if let Some((direction, old, new)) = permit.window.adjust(&policy, permit.req_count) {
            tracing::info!(
                address = %permit.address,
                direction = direction.as_str(),
                old,
                new,
                "Window adjusted"
            );
            metrics::record_adjustment(&permit.address, direction.as_str(), new);
        }
    }

    /// Snapshot of one destination's window, if it has been seen.
    pub fn snapshot(&self, address: &str) -> Option<WindowSnapshot> {
        self.windows.get(address).map(|window| window.snapshot())
    }

    /// Snapshots of every known destination, ordered by address.
    pub fn snapshots(&self) -> BTreeMap<String, WindowSnapshot> {
        self.windows
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    /// Number of destinations tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn window(&self, address: &str) -> Arc<WindowState> {
        if let Some(window) = self.windows.get(address) {
            return Arc::clone(window.value());
        }
        let floor = self.policy.load().min_request;
        let entry = self
            .windows
            .entry(address.to_owned())
            .or_insert_with(|| Arc::new(WindowState::new(floor)));
        Arc::clone(entry.value())
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(WindowPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::clock::ManualClock;
    use crate::admission::types::RequestDescriptor;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ADDR: &str = "10.0.0.1:20880";

    fn request() -> RequestDescriptor {
        RequestDescriptor::new("com.example.OrderService", "place")
    }

    fn controller() -> (AdmissionController, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let controller =
            AdmissionController::with_clock(WindowPolicy::default(), Arc::new(clock.clone()));
        (controller, clock)
    }

    #[test]
    fn test_first_request_creates_window_and_grows() {
        let (controller, _) = controller();
        assert!(controller.is_empty());

        let res = controller.handle(ADDR, request(), |_| Ok::<_, ()>("pong"));
        assert_eq!(res, Ok(Ok("pong")));

        let snap = controller.snapshot(ADDR).unwrap();
        assert_eq!(snap.request_count, 1);
        assert_eq!(snap.max_request, 1300);
        assert_eq!(controller.len(), 1);
    }

    #[test]
    fn test_upstream_failure_passes_through() {
        let (controller, _) = controller();
        let res = controller.handle(ADDR, request(), |_| Err::<(), _>("boom"));
        assert_eq!(res, Ok(Err("boom")));

        let snap = controller.snapshot(ADDR).unwrap();
        assert_eq!(snap.fail_count, 1);
        assert_eq!(snap.record_start, 1_000_000);
    }

    #[test]
    fn test_rejection_skips_next() {
        let (controller, _) = controller();
        // Hold the window at the floor for the whole period.
        let _ = controller.handle(ADDR, request(), |_| Err::<(), ()>(()));
        for _ in 0..1000 {
            let res = controller.handle(ADDR, request(), |_| Ok::<(), ()>(()));
            assert!(res.is_ok());
        }

        let called = AtomicBool::new(false);
        let res = controller.handle(ADDR, request(), |_| {
            called.store(true, Ordering::SeqCst);
            Ok::<(), ()>(())
        });

        assert!(!called.load(Ordering::SeqCst));
        let err = res.unwrap_err();
        assert_eq!(err.to_string(), "10.0.0.1:20880 is busy");
        assert_eq!(
            err,
            AdmissionError::Busy {
                address: ADDR.to_string(),
                request: "com.example.OrderService.place".to_string(),
            }
        );
    }

    #[test]
    fn test_latency_measured_with_clock() {
        let (controller, clock) = controller();
        let res = controller.handle(ADDR, request(), |_| {
            clock.advance(5_001);
            Ok::<(), ()>(())
        });
        assert!(res.is_ok());

        let snap = controller.snapshot(ADDR).unwrap();
        assert_eq!(snap.slow_response_count, 1);
        assert_eq!(snap.record_start, 1_000_000);
        assert_eq!(snap.max_request, 1000);
    }

    #[test]
    fn test_update_policy_applies_to_new_windows() {
        let (controller, _) = controller();
        let policy = WindowPolicy {
            min_request: 10,
            max_request: 100,
            ..WindowPolicy::default()
        };
        controller.update_policy(policy.clone()).unwrap();
        assert_eq!(*controller.policy(), policy);

        let _ = controller.handle(ADDR, request(), |_| Err::<(), ()>(()));
        assert_eq!(controller.snapshot(ADDR).unwrap().max_request, 10);
    }

    #[test]
    fn test_update_policy_rejects_invalid_policy() {
        let (controller, _) = controller();
        let invalid = WindowPolicy {
            min_request: 0,
            slide_ratio: 1.0,
            ..WindowPolicy::default()
        };

        let errors = controller.update_policy(invalid).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroFloor));
        assert!(errors.contains(&ValidationError::SlideRatio(1.0)));
        assert_eq!(*controller.policy(), WindowPolicy::default());

        // New destinations still start from the old floor.
        let _ = controller.handle(ADDR, request(), |_| Err::<(), ()>(()));
        assert_eq!(controller.snapshot(ADDR).unwrap().max_request, 1000);
    }

    #[tokio::test]
    async fn test_handle_async_passthrough() {
        let (controller, _) = controller();
        let res = controller
            .handle_async(ADDR, request(), |req| async move {
                Ok::<_, ()>(req.method)
            })
            .await;
        assert_eq!(res, Ok(Ok("place".to_string())));
        assert_eq!(controller.snapshot(ADDR).unwrap().max_request, 1300);
    }

    #[test]
    fn test_manual_phases() {
        let (controller, _) = controller();
        let permit = controller.admit(ADDR, &request()).unwrap();
        assert_eq!(permit.address(), ADDR);
        assert_eq!(permit.request_count(), 0);
        controller.complete(permit, true);
        assert_eq!(controller.snapshot(ADDR).unwrap().fail_count, 1);
    }
}
