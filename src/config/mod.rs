//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to the composition root (lifecycle::startup)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → fault trap policy swapped atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Feature toggles live in each section (`enabled`)

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DependencyConfig, FaultTrapConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ProbeConfig, RecoveryConfig, ServiceConfig, TimeoutConfig, TlsConfig,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
