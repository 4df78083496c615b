//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FlowControlConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → AdmissionController::update_policy swaps the policy in
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Invalid reloads are logged and dropped; the running policy stays

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{FlowControlConfig, ObservabilityConfig, WindowPolicy};
pub use validation::{validate_policy, ValidationError};
