//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals and timeouts > 0)
//! - Validate addresses, probe paths and dependency targets
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{DependencyConfig, ProbeConfig, ServiceConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must start with '/': {value:?}")]
    RelativePath { field: &'static str, value: String },

    #[error("{field} must be a literal path without captures or wildcards: {value:?}")]
    RouteSyntax { field: &'static str, value: String },

    #[error("liveness and readiness probes share the path {0:?}")]
    DuplicateProbePath(String),

    #[error("fault_trap.critical_markers contains an empty marker")]
    EmptyMarker,

    #[error("dependency {name:?}: {reason}")]
    InvalidDependency { name: String, reason: String },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    errors.extend(check_probe_paths(&config.probes));

    if config.recovery.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "recovery.interval_secs" });
    }
    if config.recovery.check_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "recovery.check_timeout_secs" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }
    for dependency in &config.recovery.dependencies {
        if let Err(reason) = check_dependency(dependency) {
            errors.push(ValidationError::InvalidDependency {
                name: dependency.name().to_string(),
                reason,
            });
        }
    }

    if config.fault_trap.critical_markers.iter().any(|m| m.is_empty()) {
        errors.push(ValidationError::EmptyMarker);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Probe paths are mounted as literal axum routes.
pub(crate) fn check_probe_paths(probes: &ProbeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_path(&mut errors, "probes.liveness_path", &probes.liveness_path);
    check_path(&mut errors, "probes.readiness_path", &probes.readiness_path);
    if probes.liveness_path == probes.readiness_path {
        errors.push(ValidationError::DuplicateProbePath(probes.liveness_path.clone()));
    }
    errors
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            field,
            value: value.to_string(),
        });
    }

    // `:name`, `*rest`, `{name}` and `{*rest}` are route captures, not literals
    let captures = value.split('/').any(|segment| segment.starts_with(':'))
        || value.contains(['{', '}', '*']);
    if captures {
        errors.push(ValidationError::RouteSyntax {
            field,
            value: value.to_string(),
        });
    }
}

fn check_dependency(dependency: &DependencyConfig) -> Result<(), String> {
    if dependency.name().is_empty() {
        return Err("name must not be empty".to_string());
    }
    match dependency {
        DependencyConfig::Http { url, .. } => {
            let parsed = Url::parse(url).map_err(|e| format!("invalid url {:?}: {}", url, e))?;
            if parsed.scheme() != "http" {
                return Err(format!("only http:// urls are probed, got {:?}", parsed.scheme()));
            }
            Ok(())
        }
        DependencyConfig::Tcp { address, .. } => {
            // host:port, host may be a DNS name
            match address.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
                _ => Err(format!("expected host:port, got {:?}", address)),
            }
        }
    }
}
