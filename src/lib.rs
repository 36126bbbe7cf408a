//! Self-healing health probes for HTTP services.
//!
//! Request faults flip readiness, a background loop verifies dependencies
//! and restores it, and liveness/readiness are exposed for orchestrators.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use health::{Fault, FaultTrap, HealthState, RecoveryLoop, Verifier};
pub use http::HttpServer;
pub use lifecycle::{Service, Shutdown};
