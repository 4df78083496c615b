//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! AdmissionController produces:
//!     → tracing events (rejections, window changes, resets)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Diagnostics never influence admission decisions
//! - Metric updates are cheap and safe without an installed recorder

pub mod logging;
pub mod metrics;
