//! Synthetic remote endpoint for driving traffic without a network.

use std::time::Duration;
use thiserror::Error;

use crate::admission::RequestDescriptor;

/// Failure returned by [`SyntheticUpstream`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{address}: {request} failed upstream")]
pub struct UpstreamError {
    pub address: String,
    pub request: String,
}

/// An endpoint that answers after a fixed latency and fails at random.
#[derive(Debug, Clone)]
pub struct SyntheticUpstream {
    failure_rate: f64,
    latency: Duration,
}

impl SyntheticUpstream {
    /// `failure_rate` is clamped into `[0, 1]`.
    pub fn new(failure_rate: f64, latency: Duration) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency,
        }
    }

    pub async fn call(
        &self,
        address: &str,
        request: RequestDescriptor,
    ) -> Result<String, UpstreamError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if fastrand::f64() < self.failure_rate {
            Err(UpstreamError {
                address: address.to_string(),
                request: request.to_string(),
            })
        } else {
            Ok(format!("{} answered {}", address, request))
        }
    }
}
