//! Background recovery loop.
//!
//! # Responsibilities
//! - Tick on a fixed period
//! - While not ready, run the verifier and restore readiness on success
//! - Contain every verification fault
//!
//! # Loop States
//! ```text
//! Monitoring-Idle: ready, tick does nothing
//! Degraded:        not ready, tick runs one verification
//! ```
//!
//! # Design Decisions
//! - First tick fires immediately
//! - Each verification is bounded by `check_timeout_secs`
//! - Errors, panics and timeouts inside the verifier all mean "stay degraded"
//! - Shutdown is raced against both the timer and the verification; once
//!   it wins, the loop writes nothing more

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::RecoveryConfig;
use crate::health::fault::panic_message;
use crate::health::state::HealthState;
use crate::health::verify::Verifier;
use crate::observability::metrics;

/// Result of one verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Passed,
    Failed,
    Errored,
    TimedOut,
}

impl Verification {
    pub fn succeeded(self) -> bool {
        self == Verification::Passed
    }

    fn label(self) -> &'static str {
        match self {
            Verification::Passed => "passed",
            Verification::Failed => "failed",
            Verification::Errored => "errored",
            Verification::TimedOut => "timed_out",
        }
    }
}

pub struct RecoveryLoop {
    state: Arc<HealthState>,
    verifier: Arc<dyn Verifier>,
    config: RecoveryConfig,
}

impl RecoveryLoop {
    pub fn new(
        state: Arc<HealthState>,
        verifier: Arc<dyn Verifier>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            state,
            verifier,
            config,
        }
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Recovery loop disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            check_timeout_secs = self.config.check_timeout_secs,
            verifier = self.verifier.name(),
            "Recovery loop starting"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Recovery loop received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {}
            }

            if self.state.is_ready() {
                continue;
            }

            tracing::info!(diagnostic = %self.state.diagnostic(), "Running recovery verification");

            let outcome = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!(
                        "Recovery loop received shutdown signal, abandoning verification"
                    );
                    break;
                }
                outcome = self.verify() => outcome,
            };

            if outcome.succeeded() {
                tracing::info!(
                    verifier = self.verifier.name(),
                    "System restored, marking as ready"
                );
                self.state.mark_ready();
            } else {
                tracing::warn!(
                    verifier = self.verifier.name(),
                    outcome = outcome.label(),
                    retry_in_secs = self.config.interval_secs,
                    "Verification failed, will retry"
                );
            }
        }
    }

    /// One bounded, fault-contained verification attempt.
    pub async fn verify(&self) -> Verification {
        let started = Instant::now();
        let attempt = AssertUnwindSafe(self.verifier.verify()).catch_unwind();

        let outcome = match time::timeout(self.config.check_timeout(), attempt).await {
            Ok(Ok(Ok(true))) => Verification::Passed,
            Ok(Ok(Ok(false))) => Verification::Failed,
            Ok(Ok(Err(e))) => {
                tracing::error!(
                    verifier = self.verifier.name(),
                    error = %e,
                    "Error during verification"
                );
                Verification::Errored
            }
            Ok(Err(payload)) => {
                tracing::error!(
                    verifier = self.verifier.name(),
                    panic = %panic_message(payload.as_ref()),
                    "Verifier panicked"
                );
                Verification::Errored
            }
            Err(_) => {
                tracing::warn!(
                    verifier = self.verifier.name(),
                    timeout_secs = self.config.check_timeout_secs,
                    "Verification timed out"
                );
                Verification::TimedOut
            }
        };

        metrics::record_recovery_attempt(outcome.label(), started);
        outcome
    }
}
