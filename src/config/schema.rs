//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and fall
//! back to defaults for every missing field.

use serde::{Deserialize, Serialize};

/// Floor of the admission window.
pub const MIN_REQUEST: u64 = 1000;
/// Ceiling of the admission window.
pub const MAX_REQUEST: u64 = 9000;
/// Fractional step used when growing or shrinking the window.
pub const SLIDE_RATIO: f64 = 0.3;
/// How long an observation period accumulates before being reset (ms).
pub const CLEAR_PERIOD_MS: u64 = 5_000;
/// Slow-response count above which the window shrinks.
pub const SLOW_RESPONSE_THRESHOLD: u64 = 5;
/// Failure ratio above which the window shrinks.
pub const FAIL_RATIO_THRESHOLD: f64 = 0.3;
/// Latency above which a response counts as slow (ms).
pub const RECORD_RESPONSE_THRESHOLD_MS: u64 = 5_000;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FlowControlConfig {
    /// Window adaptation parameters.
    pub policy: WindowPolicy,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Parameters driving admission and window adaptation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WindowPolicy {
    /// Window floor; also the value a window restarts from after a reset.
    pub min_request: u64,

    /// Window ceiling; growth stops once the window reaches it.
    pub max_request: u64,

    /// Step ratio applied on grow and shrink.
    pub slide_ratio: f64,

    /// Observation period length in milliseconds.
    pub clear_period_ms: u64,

    /// Number of slow responses tolerated per period.
    pub slow_response_threshold: u64,

    /// Failure ratio tolerated per period.
    pub fail_ratio_threshold: f64,

    /// Latency in milliseconds above which a response is slow.
    pub slow_response_ms: u64,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            min_request: MIN_REQUEST,
            max_request: MAX_REQUEST,
            slide_ratio: SLIDE_RATIO,
            clear_period_ms: CLEAR_PERIOD_MS,
            slow_response_threshold: SLOW_RESPONSE_THRESHOLD,
            fail_ratio_threshold: FAIL_RATIO_THRESHOLD,
            slow_response_ms: RECORD_RESPONSE_THRESHOLD_MS,
        }
    }
}

impl WindowPolicy {
    // Ratios are taken in thousandths so truncation is exact, e.g.
    // `floor(1000 * 0.3) == 300`.
    fn per_mille(&self) -> u128 {
        (self.slide_ratio * 1000.0).round() as u128
    }

    /// Size of one step for a window of `value`, truncated.
    pub fn slide_step(&self, value: u64) -> u64 {
        let step = u128::from(value) * self.per_mille() / 1000;
        u64::try_from(step).unwrap_or(u64::MAX)
    }

    /// `floor(value + value * ratio)`.
    pub fn grown(&self, value: u64) -> u64 {
        value.saturating_add(self.slide_step(value))
    }

    /// `floor(value - value * ratio)`; the result is truncated, not the step.
    pub fn shrunk(&self, value: u64) -> u64 {
        let kept = 1000u128.saturating_sub(self.per_mille());
        let new = u128::from(value) * kept / 1000;
        u64::try_from(new).unwrap_or(u64::MAX)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
