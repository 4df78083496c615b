//! Metrics collection and exposition.
//!
//! # Metrics
//! - `flow_control_requests_total` (counter): requests by address, outcome
//! - `flow_control_window_adjustments_total` (counter): by address, direction
//! - `flow_control_window_resets_total` (counter): expired periods by address
//! - `flow_control_window_size` (gauge): current window per address
//! - `flow_control_response_duration_ms` (histogram): delegated call latency
//!
//! Recording is a no-op until a recorder is installed, so the controller can
//! run unobserved.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus exporter on `addr` and describe all metrics.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    tracing::info!(address = %addr, "Prometheus metrics exporter started");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "flow_control_requests_total",
        "Requests seen by the admission controller"
    );
    describe_counter!(
        "flow_control_window_adjustments_total",
        "Window grow and shrink steps"
    );
    describe_counter!(
        "flow_control_window_resets_total",
        "Observation periods expired and reset"
    );
    describe_gauge!("flow_control_window_size", "Current admission window");
    describe_histogram!(
        "flow_control_response_duration_ms",
        "Latency of admitted calls in milliseconds"
    );
}

pub fn record_admitted(address: &str) {
    counter!(
        "flow_control_requests_total",
        "address" => address.to_string(),
        "outcome" => "admitted"
    )
    .increment(1);
}

pub fn record_rejected(address: &str) {
    counter!(
        "flow_control_requests_total",
        "address" => address.to_string(),
        "outcome" => "rejected"
    )
    .increment(1);
}

pub fn record_reset(address: &str) {
    counter!("flow_control_window_resets_total", "address" => address.to_string()).increment(1);
}

pub fn record_adjustment(address: &str, direction: &'static str, new_window: u64) {
    counter!(
        "flow_control_window_adjustments_total",
        "address" => address.to_string(),
        "direction" => direction
    )
    .increment(1);
    record_window_size(address, new_window);
}

pub fn record_window_size(address: &str, window: u64) {
    gauge!("flow_control_window_size", "address" => address.to_string()).set(window as f64);
}

pub fn record_duration(address: &str, elapsed_ms: u64) {
    histogram!("flow_control_response_duration_ms", "address" => address.to_string())
        .record(elapsed_ms as f64);
}
