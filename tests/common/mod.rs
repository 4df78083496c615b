//! Shared helpers for integration tests.

use std::sync::Arc;

use flow_control::admission::{AdmissionController, AdmissionResult, ManualClock, RequestDescriptor};
use flow_control::config::WindowPolicy;

/// Non-zero start so trouble can always be timestamped.
pub const START_MILLIS: u64 = 1_700_000_000_000;

/// A controller on a manual clock with the default policy.
pub fn controller() -> (AdmissionController, ManualClock) {
    controller_with(WindowPolicy::default())
}

#[allow(dead_code)]
pub fn controller_with(policy: WindowPolicy) -> (AdmissionController, ManualClock) {
    let clock = ManualClock::new(START_MILLIS);
    let controller = AdmissionController::with_clock(policy, Arc::new(clock.clone()));
    (controller, clock)
}

pub fn request() -> RequestDescriptor {
    RequestDescriptor::new("com.example.InventoryService", "reserve")
}

/// A fast successful call.
pub fn succeed(
    controller: &AdmissionController,
    address: &str,
) -> AdmissionResult<Result<(), String>> {
    controller.handle(address, request(), |_| Ok(()))
}

/// A fast failed call.
pub fn fail(
    controller: &AdmissionController,
    address: &str,
) -> AdmissionResult<Result<(), String>> {
    controller.handle(address, request(), |_| Err("upstream error".to_string()))
}

/// A successful call that takes `millis` on the manual clock.
#[allow(dead_code)]
pub fn succeed_after(
    controller: &AdmissionController,
    clock: &ManualClock,
    address: &str,
    millis: u64,
) -> AdmissionResult<Result<(), String>> {
    controller.handle(address, request(), |_| {
        clock.advance(millis);
        Ok(())
    })
}

/// A failed call that takes `millis` on the manual clock.
#[allow(dead_code)]
pub fn fail_after(
    controller: &AdmissionController,
    clock: &ManualClock,
    address: &str,
    millis: u64,
) -> AdmissionResult<Result<(), String>> {
    controller.handle(address, request(), |_| {
        clock.advance(millis);
        Err("upstream error".to_string())
    })
}

#[allow(dead_code)]
pub fn window(controller: &AdmissionController, address: &str) -> u64 {
    controller.snapshot(address).map(|s| s.max_request).unwrap_or_default()
}
