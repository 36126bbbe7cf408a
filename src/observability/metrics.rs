//! Metrics collection and exposition.
//!
//! # Metrics
//! - `service_probe_healthy` (gauge): 1=healthy, 0=unhealthy, by probe
//! - `recovery_attempts_total` (counter): verification attempts by outcome
//! - `recovery_verification_duration_seconds` (histogram)
//! - `faults_total` (counter): trapped faults by classification
//!
//! # Design Decisions
//! - Helpers are no-ops until a recorder is installed (tests, embedding)
//! - Prometheus exporter serves its own listener

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_probe_state(probe: &'static str, healthy: bool) {
    gauge!("service_probe_healthy", "probe" => probe).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_recovery_attempt(outcome: &'static str, started: Instant) {
    counter!("recovery_attempts_total", "outcome" => outcome).increment(1);
    histogram!("recovery_verification_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_fault(class: &'static str) {
    counter!("faults_total", "class" => class).increment(1);
}
