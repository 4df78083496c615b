//! Adaptive per-destination admission control.
//!
//! Bounds how many requests each destination address receives within an
//! observation period and widens or narrows that bound from observed failure
//! and slow-response rates, much like a TCP congestion window.

pub mod admission;
pub mod config;
pub mod observability;
pub mod simulation;

pub use admission::{AdmissionController, AdmissionError, RequestDescriptor};
pub use config::{FlowControlConfig, WindowPolicy};
