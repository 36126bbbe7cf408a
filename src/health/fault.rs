//! Request fault trap.
//!
//! # Responsibilities
//! - Contain unhandled faults from application handlers
//! - Classify each fault as transient or critical
//! - Downgrade readiness on critical faults
//! - Turn every fault into a generic 500 response
//!
//! # What counts as a fault
//! - A handler returning `Err(Fault)`
//! - A handler panicking
//!
//! # Design Decisions
//! - Typed classification first (`Fault::critical_dependency`), then
//!   marker substrings from config
//! - Raw fault text only reaches clients when explicitly enabled; otherwise
//!   the body carries an incident id that matches the error log
//! - Policy is swapped atomically on config reload

use arc_swap::ArcSwap;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::FaultTrapConfig;
use crate::health::state::HealthState;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;

/// Error type for application handlers behind the fault trap.
#[derive(Debug, Clone)]
pub struct Fault {
    message: String,
    cause: Option<String>,
    dependency: Option<String>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
            dependency: None,
        }
    }

    /// A fault raised by a dependency the service cannot work without.
    /// Always classified critical, with the dependency name as diagnostic.
    pub fn critical_dependency(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            dependency: Some(dependency.into()),
            ..Self::new(message)
        }
    }

    /// Capture an error and its source chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(e) = source {
            chain.push(e.to_string());
            source = e.source();
        }

        let fault = Self::new(error.to_string());
        if chain.is_empty() {
            fault
        } else {
            fault.with_cause(chain.join(": "))
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Fault {}

impl IntoResponse for Fault {
    /// Bare 500 carrying the fault for the trap to pick up. Without a trap in
    /// front, clients only see the status.
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// How a fault affects readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultClass {
    /// Logged only.
    Transient,
    /// Marks the service not ready with the given diagnostic.
    Critical(String),
}

impl FaultClass {
    fn label(&self) -> &'static str {
        match self {
            FaultClass::Transient => "transient",
            FaultClass::Critical(_) => "critical",
        }
    }
}

/// An intercepted fault after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultRecord {
    pub description: String,
    pub cause: Option<String>,
    pub classification: FaultClass,
}

/// Classification and exposure rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultPolicy {
    critical_markers: Vec<String>,
    expose_messages: bool,
}

impl FaultPolicy {
    pub fn from_config(config: &FaultTrapConfig) -> Self {
        Self {
            critical_markers: config.critical_markers.clone(),
            expose_messages: config.expose_messages,
        }
    }

    pub fn classify(&self, fault: &Fault) -> FaultClass {
        if let Some(dependency) = &fault.dependency {
            return FaultClass::Critical(dependency.clone());
        }

        self.critical_markers
            .iter()
            .find(|marker| fault.message.contains(marker.as_str()))
            .map(|marker| FaultClass::Critical(marker.clone()))
            .unwrap_or(FaultClass::Transient)
    }
}

/// Where a fault happened, for the log line.
#[derive(Debug, Default)]
struct RequestInfo {
    method: String,
    path: String,
    request_id: Option<String>,
}

/// Guard around the request pipeline. Shared as `Arc<FaultTrap>`.
pub struct FaultTrap {
    state: Arc<HealthState>,
    policy: ArcSwap<FaultPolicy>,
}

impl FaultTrap {
    pub fn new(state: Arc<HealthState>, config: &FaultTrapConfig) -> Self {
        Self {
            state,
            policy: ArcSwap::from_pointee(FaultPolicy::from_config(config)),
        }
    }

    /// Wrap `router` so every route runs inside the trap.
    pub fn wrap(self: &Arc<Self>, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(Arc::clone(self), fault_trap_middleware))
    }

    /// Replace the classification policy. Faults already being handled keep
    /// the policy they started with.
    pub fn reload(&self, config: &FaultTrapConfig) {
        let next = FaultPolicy::from_config(config);
        if **self.policy.load() != next {
            tracing::info!(
                markers = ?next.critical_markers,
                expose_messages = next.expose_messages,
                "Fault trap policy reloaded"
            );
            self.policy.store(Arc::new(next));
        }
    }

    pub fn policy(&self) -> Arc<FaultPolicy> {
        self.policy.load_full()
    }

    /// Log, classify and apply one fault, then build the client response.
    fn handle(&self, fault: Fault, info: &RequestInfo) -> Response {
        let policy = self.policy.load();
        let record = FaultRecord {
            classification: policy.classify(&fault),
            description: fault.message,
            cause: fault.cause,
        };
        let incident = Uuid::new_v4();

        tracing::error!(
            incident = %incident,
            request_id = info.request_id.as_deref().unwrap_or("unknown"),
            method = %info.method,
            path = %info.path,
            fault = %record.description,
            cause = record.cause.as_deref().unwrap_or(""),
            classification = record.classification.label(),
            "Unhandled fault"
        );
        metrics::record_fault(record.classification.label());

        if let FaultClass::Critical(diagnostic) = &record.classification {
            self.state.mark_error(diagnostic.clone());
        }

        let body = if policy.expose_messages {
            record.description
        } else {
            format!("Internal Server Error (incident {})", incident)
        };
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Axum middleware: run the rest of the pipeline and contain its faults.
pub async fn fault_trap_middleware(
    State(trap): State<Arc<FaultTrap>>,
    request: Request,
    next: Next,
) -> Response {
    let info = RequestInfo {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        request_id: request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };

    let fault = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(mut response) => match response.extensions_mut().remove::<Fault>() {
            Some(fault) => fault,
            None => return response,
        },
        Err(payload) => Fault::new(panic_message(payload.as_ref())).with_cause("handler panicked"),
    };

    trap.handle(fault, &info)
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
