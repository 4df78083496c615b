//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Request to destination (address):
//!     → controller.rs (look up window, count, admit or reject)
//!     → next stage (delegated call, timed)
//!     → window.rs (record slow/failed, grow/shrink/hold)
//!     → outcome returned unchanged, or AdmissionError::Busy
//! ```
//!
//! # Design Decisions
//! - One window per destination address, never evicted
//! - Lock-free: every counter is an atomic, the map is a DashMap
//! - Small cross-field races are tolerated in exchange for throughput
//! - The clock is injectable so periods and latency are testable

pub mod clock;
pub mod controller;
pub mod error;
pub mod types;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{AdmissionController, Permit};
pub use error::{AdmissionError, AdmissionResult};
pub use types::{Invocation, Outcome, RequestDescriptor};
pub use window::{Adjustment, WindowSnapshot, WindowState};
