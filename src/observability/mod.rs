//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HealthState transitions, recovery attempts, trapped faults
//!     → logging.rs (tracing subscriber: pretty or JSON on stdout)
//!     → metrics.rs (probe gauges, attempt/fault counters, verification latency)
//!
//! Consumers:
//!     → log aggregation
//!     → Prometheus scrape of the exporter listener
//! ```
//!
//! Fault logs carry the request id and an incident id so a 500 seen by a
//! client can be matched to its log line.

pub mod logging;
pub mod metrics;
