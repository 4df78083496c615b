//! Configuration validation.
//!
//! Serde handles the syntax; this checks value ranges and returns every
//! problem found rather than stopping at the first one.

use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::{FlowControlConfig, WindowPolicy};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("policy.min_request must be at least 1")]
    ZeroFloor,

    #[error("policy.min_request ({min}) exceeds policy.max_request ({max})")]
    FloorAboveCeiling { min: u64, max: u64 },

    #[error("policy.slide_ratio must be in (0, 1), got {0}")]
    SlideRatio(f64),

    #[error("policy.fail_ratio_threshold must be in [0, 1], got {0}")]
    FailRatio(f64),

    #[error("policy.{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("observability.log_level '{0}' is not a valid filter")]
    LogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &FlowControlConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    policy_errors(&config.policy, &mut errors);

    let observability = &config.observability;
    if EnvFilter::try_new(&observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    into_result(errors)
}

/// Validate a window policy on its own, e.g. one handed over at runtime.
pub fn validate_policy(policy: &WindowPolicy) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    policy_errors(policy, &mut errors);
    into_result(errors)
}

fn policy_errors(policy: &WindowPolicy, errors: &mut Vec<ValidationError>) {
    if policy.min_request == 0 {
        errors.push(ValidationError::ZeroFloor);
    }
    if policy.min_request > policy.max_request {
        errors.push(ValidationError::FloorAboveCeiling {
            min: policy.min_request,
            max: policy.max_request,
        });
    }
    if !(policy.slide_ratio > 0.0 && policy.slide_ratio < 1.0) {
        errors.push(ValidationError::SlideRatio(policy.slide_ratio));
    }
    if !(0.0..=1.0).contains(&policy.fail_ratio_threshold) {
        errors.push(ValidationError::FailRatio(policy.fail_ratio_threshold));
    }
    if policy.clear_period_ms == 0 {
        errors.push(ValidationError::ZeroDuration("clear_period_ms"));
    }
    if policy.slow_response_ms == 0 {
        errors.push(ValidationError::ZeroDuration("slow_response_ms"));
    }
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
