//! Admission errors.

use thiserror::Error;

/// Errors synthesized by the controller itself.
///
/// Failures of the delegated call are not represented here; they travel
/// unchanged inside the outcome returned by the next stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The destination's window is exhausted for the current period.
    #[error("{address} is busy")]
    Busy {
        /// Destination address (host:port).
        address: String,
        /// `interface.method` of the rejected request.
        request: String,
    },
}

/// Result type for admission-controlled calls.
pub type AdmissionResult<T> = Result<T, AdmissionError>;
