//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → HealthState → FaultTrap + Verifier → spawn RecoveryLoop → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, recovery loop exits → join
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then state, then background tasks, then listeners
//! - Shutdown has a grace period: tasks still running afterwards are aborted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{BackgroundTasks, Service};
