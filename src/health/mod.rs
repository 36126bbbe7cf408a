//! Health subsystem: readiness state and the actors that change it.
//!
//! # Data Flow
//! ```text
//! Fault trap (fault.rs):
//!     Request handler fails or panics
//!     → Classify fault
//!     → mark_error on state.rs if critical
//!
//! Recovery loop (recovery.rs):
//!     Periodic timer
//!     → Not ready? run verify.rs
//!     → mark_ok on state.rs on success
//!
//! Reporter (report.rs):
//!     /livez, /readyz
//!     → read state.rs snapshot
//! ```
//!
//! # Design Decisions
//! - One HealthState per process, injected as Arc, never global
//! - Only the fault trap degrades readiness, only the recovery loop restores it
//! - Probe reads are lock-free

pub mod fault;
pub mod recovery;
pub mod report;
pub mod state;
pub mod verify;

pub use fault::{Fault, FaultClass, FaultPolicy, FaultRecord, FaultTrap};
pub use recovery::{RecoveryLoop, Verification};
pub use report::probe_router;
pub use state::{HealthState, ProbeStatus};
pub use verify::{Verifier, VerifyError};
