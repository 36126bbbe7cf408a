//! Host-level errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::health::VerifyError;

/// Errors that stop the service from starting or serving.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build verifier: {0}")]
    Verifier(#[from] VerifyError),

    #[error("invalid {field} {value:?}: {source}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("probe routes {liveness_path:?}, {readiness_path:?} overlap app routes: {reason}")]
    RouteConflict {
        liveness_path: String,
        readiness_path: String,
        reason: String,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("failed to load TLS material: {0}")]
    Tls(std::io::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}
