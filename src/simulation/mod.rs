//! Traffic simulation for exercising the controller end to end.
//!
//! # Data Flow
//! ```text
//! runner.rs spawns workers per destination
//!     → AdmissionController::handle_async
//!     → upstream.rs (sleep, random failure)
//!     → per-address tallies + final window snapshots
//! ```

pub mod runner;
pub mod upstream;

pub use runner::{run, AddressReport, SimulationConfig};
pub use upstream::{SyntheticUpstream, UpstreamError};
