//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the Axum router: application routes behind the fault trap,
//!   probe routes beside them
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve plain or TLS until shutdown

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::validation::check_probe_paths;
use crate::config::{ConfigError, ProbeConfig, ServiceConfig, TlsConfig};
use crate::error::ServiceError;
use crate::health::fault::panic_message;
use crate::health::{probe_router, FaultTrap, HealthState};
use crate::http::request::UuidRequestId;

/// HTTP front of the service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// `app` holds the application routes; they are wrapped by `trap` when
    /// the fault trap is enabled.
    ///
    /// Fails when a probe path is not a literal route or is already taken by
    /// an application route.
    pub fn new(
        config: ServiceConfig,
        state: Arc<HealthState>,
        trap: Arc<FaultTrap>,
        app: Router,
    ) -> Result<Self, ServiceError> {
        let router = Self::build_router(&config, state, &trap, app)?;
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &ServiceConfig,
        state: Arc<HealthState>,
        trap: &Arc<FaultTrap>,
        app: Router,
    ) -> Result<Router, ServiceError> {
        let app = if config.fault_trap.enabled {
            trap.wrap(app)
        } else {
            tracing::warn!("Fault trap disabled, handler faults will not affect readiness");
            app
        };

        let router = if config.probes.enabled {
            mount_probes(app, state, &config.probes)?
        } else {
            app
        };

        Ok(router
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId)))
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServiceError> {
        let addr = listener.local_addr().map_err(ServiceError::Serve)?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await
            .map_err(ServiceError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Bind the configured address (with TLS when configured) and serve.
    pub async fn serve(self, shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        let address = self.config.listener.bind_address.clone();

        match self.config.listener.tls.clone() {
            Some(tls) => {
                let addr: SocketAddr =
                    address
                        .parse()
                        .map_err(|source| ServiceError::InvalidAddress {
                            field: "listener.bind_address",
                            value: address.clone(),
                            source,
                        })?;
                self.serve_tls(addr, &tls, shutdown).await
            }
            None => {
                let listener = TcpListener::bind(&address)
                    .await
                    .map_err(|source| ServiceError::Bind { address, source })?;
                self.run(listener, shutdown).await
            }
        }
    }

    async fn serve_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServiceError> {
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(ServiceError::Tls)?;

        let handle = axum_server::Handle::new();
        let trigger = handle.clone();
        let grace = self.config.timeouts.shutdown_grace();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!(grace_secs = grace.as_secs(), "HTTPS server received shutdown signal");
            trigger.graceful_shutdown(Some(grace));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await
            .map_err(ServiceError::Serve)?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Merge the probe routes into `app`.
///
/// axum exposes no route table and panics on overlapping routes, so the
/// merge runs under `catch_unwind` and an overlap becomes an error.
fn mount_probes(
    app: Router,
    state: Arc<HealthState>,
    probes: &ProbeConfig,
) -> Result<Router, ServiceError> {
    let errors = check_probe_paths(probes);
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors).into());
    }

    panic::catch_unwind(AssertUnwindSafe(|| app.merge(probe_router(state, probes)))).map_err(
        |payload| {
            let reason = panic_message(payload.as_ref());
            tracing::error!(
                liveness_path = %probes.liveness_path,
                readiness_path = %probes.readiness_path,
                reason = %reason,
                "Probe routes conflict with application routes"
            );
            ServiceError::RouteConflict {
                liveness_path: probes.liveness_path.clone(),
                readiness_path: probes.readiness_path.clone(),
                reason,
            }
        },
    )
}
