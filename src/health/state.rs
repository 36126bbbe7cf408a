//! Process health state machine.
//!
//! # States
//! - Ready: service receives traffic
//! - NotReady: orchestrator should stop routing traffic here
//! - Alive / Dead: whether the process should be restarted
//!
//! # State Transitions
//! ```text
//! Ready → NotReady: critical fault trapped (mark_error)
//! NotReady → Ready: recovery verification succeeds (mark_ok)
//! ```
//!
//! # Design Decisions
//! - Each probe holds an immutable (healthy, message) snapshot
//! - Snapshots are swapped whole, readers never see a torn pair
//! - Readers never take a lock
//! - State changes logged for observability

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::observability::metrics;

/// Immutable view of one probe at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStatus {
    /// Whether the probe currently reports healthy.
    pub healthy: bool,
    /// Last diagnostic set alongside the flag.
    pub message: String,
}

impl ProbeStatus {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

/// A single probe (liveness or readiness).
#[derive(Debug)]
pub struct Probe {
    name: &'static str,
    status: ArcSwap<ProbeStatus>,
}

impl Probe {
    /// Starts healthy; the gauge is exported from construction on.
    fn new(name: &'static str) -> Self {
        metrics::record_probe_state(name, true);
        Self {
            name,
            status: ArcSwap::from_pointee(ProbeStatus::healthy("")),
        }
    }

    /// Flip to unhealthy. Repeated calls only overwrite the message.
    pub fn error(&self, message: impl Into<String>) {
        self.set(ProbeStatus::unhealthy(message));
    }

    /// Flip to healthy.
    pub fn ok(&self, message: impl Into<String>) {
        self.set(ProbeStatus::healthy(message));
    }

    pub fn status(&self) -> bool {
        self.status.load().healthy
    }

    pub fn message(&self) -> String {
        self.status.load().message.clone()
    }

    /// Consistent (flag, message) pair.
    pub fn snapshot(&self) -> Arc<ProbeStatus> {
        self.status.load_full()
    }

    fn set(&self, next: ProbeStatus) {
        let next = Arc::new(next);
        let previous = self.status.swap(Arc::clone(&next));

        match (previous.healthy, next.healthy) {
            (true, false) => {
                tracing::warn!(
                    probe = self.name,
                    message = %next.message,
                    "Probe transitioned to unhealthy"
                );
            }
            (false, true) => {
                tracing::info!(
                    probe = self.name,
                    message = %next.message,
                    "Probe transitioned to healthy"
                );
            }
            _ => {
                tracing::debug!(
                    probe = self.name,
                    healthy = next.healthy,
                    message = %next.message,
                    "Probe message updated"
                );
            }
        }

        metrics::record_probe_state(self.name, next.healthy);
    }
}

/// Readiness and liveness of the whole process.
///
/// Built once by the composition root and shared as `Arc<HealthState>` with
/// the recovery loop, the fault trap and the probe endpoints.
#[derive(Debug)]
pub struct HealthState {
    readiness: Probe,
    liveness: Probe,
}

impl HealthState {
    /// Both probes start healthy with an empty message.
    pub fn new() -> Self {
        Self {
            readiness: Probe::new("readyz"),
            liveness: Probe::new("livez"),
        }
    }

    /// Mark the service as not ready to receive traffic.
    pub fn mark_error(&self, message: impl Into<String>) {
        self.readiness.error(message);
    }

    /// Mark the service as ready again.
    pub fn mark_ok(&self, message: impl Into<String>) {
        self.readiness.ok(message);
    }

    /// `mark_ok` with an empty message.
    pub fn mark_ready(&self) {
        self.mark_ok("");
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.status()
    }

    /// Last readiness diagnostic.
    pub fn diagnostic(&self) -> String {
        self.readiness.message()
    }

    pub fn mark_alive(&self, message: impl Into<String>) {
        self.liveness.ok(message);
    }

    /// Ask the orchestrator to restart the process.
    pub fn mark_dead(&self, message: impl Into<String>) {
        self.liveness.error(message);
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.status()
    }

    pub fn liveness_diagnostic(&self) -> String {
        self.liveness.message()
    }

    pub fn readiness(&self) -> Arc<ProbeStatus> {
        self.readiness.snapshot()
    }

    pub fn liveness(&self) -> Arc<ProbeStatus> {
        self.liveness.snapshot()
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
