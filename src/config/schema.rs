//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Liveness/readiness endpoints.
    pub probes: ProbeConfig,

    /// Background recovery loop.
    pub recovery: RecoveryConfig,

    /// Request fault trap.
    pub fault_trap: FaultTrapConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Probe endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Expose the probe endpoints.
    pub enabled: bool,

    /// Liveness probe path.
    pub liveness_path: String,

    /// Readiness probe path.
    pub readiness_path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            liveness_path: "/livez".to_string(),
            readiness_path: "/readyz".to_string(),
        }
    }
}

/// Recovery loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Run the recovery loop.
    pub enabled: bool,

    /// Tick period in seconds.
    pub interval_secs: u64,

    /// Upper bound for a single verification attempt in seconds.
    pub check_timeout_secs: u64,

    /// Dependencies probed during verification. All must pass.
    pub dependencies: Vec<DependencyConfig>,

    /// Replace dependency probes with the clock-parity simulation.
    pub simulate: bool,

    /// Simulated probe latency in milliseconds (only with `simulate`).
    pub simulated_delay_ms: u64,
}

impl RecoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            check_timeout_secs: 5,
            dependencies: Vec::new(),
            simulate: false,
            simulated_delay_ms: 1000,
        }
    }
}

/// A downstream dependency checked by the recovery loop.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DependencyConfig {
    /// Healthy when `GET url` answers with a 2xx status.
    Http { name: String, url: String },
    /// Healthy when a TCP connection to `address` succeeds.
    Tcp { name: String, address: String },
}

impl DependencyConfig {
    pub fn name(&self) -> &str {
        match self {
            DependencyConfig::Http { name, .. } | DependencyConfig::Tcp { name, .. } => name,
        }
    }
}

/// Fault trap configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaultTrapConfig {
    /// Wrap application routes with the fault trap.
    pub enabled: bool,

    /// Substrings that promote a fault to readiness-impacting.
    pub critical_markers: Vec<String>,

    /// Send the raw fault message to clients instead of a generic body.
    pub expose_messages: bool,
}

impl Default for FaultTrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_markers: vec!["DB_FAIL".to_string()],
            expose_messages: false,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,

    /// Time allowed for in-flight work after shutdown is requested.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
