//! Startup orchestration.
//!
//! # Responsibilities
//! - Own the process-wide HealthState and hand it to each actor
//! - Build the verifier and fault trap from config
//! - Spawn background tasks (recovery loop, config reloads)
//! - Serve HTTP, then stop and join background tasks
//!
//! # Design Decisions
//! - Fail fast: verifier construction errors are fatal
//! - Background tasks subscribe to shutdown before they are spawned
//! - Joining is bounded by the shutdown grace period

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::health::verify::build_verifier;
use crate::health::{FaultTrap, HealthState, RecoveryLoop, Verifier};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;

/// Composition root: the wired-up service before it starts running.
pub struct Service {
    config: ServiceConfig,
    state: Arc<HealthState>,
    trap: Arc<FaultTrap>,
    verifier: Arc<dyn Verifier>,
}

impl Service {
    /// Wire the service using the verifier described by `config.recovery`.
    pub fn build(config: ServiceConfig) -> Result<Self, ServiceError> {
        let verifier = build_verifier(&config.recovery)?;
        Ok(Self::with_verifier(config, verifier))
    }

    /// Wire the service around a caller-supplied verifier.
    pub fn with_verifier(config: ServiceConfig, verifier: Arc<dyn Verifier>) -> Self {
        let state = Arc::new(HealthState::new());
        let trap = Arc::new(FaultTrap::new(state.clone(), &config.fault_trap));
        Self {
            config,
            state,
            trap,
            verifier,
        }
    }

    pub fn state(&self) -> Arc<HealthState> {
        self.state.clone()
    }

    pub fn trap(&self) -> Arc<FaultTrap> {
        self.trap.clone()
    }

    /// Spawn the recovery loop and, if given an update stream, the reload task.
    pub fn spawn_background(
        &self,
        shutdown: &Shutdown,
        config_updates: Option<mpsc::UnboundedReceiver<ServiceConfig>>,
    ) -> BackgroundTasks {
        let recovery = RecoveryLoop::new(
            self.state.clone(),
            self.verifier.clone(),
            self.config.recovery.clone(),
        );
        let recovery = tokio::spawn(recovery.run(shutdown.subscribe()));

        let reload = config_updates.map(|updates| {
            tokio::spawn(apply_reloads(self.trap.clone(), updates, shutdown.subscribe()))
        });

        BackgroundTasks { recovery, reload }
    }

    /// Assemble the HTTP front; fails on unusable probe routes.
    pub fn http_server(&self, app: Router) -> Result<HttpServer, ServiceError> {
        HttpServer::new(self.config.clone(), self.state.clone(), self.trap.clone(), app)
    }

    /// Run on the configured listener until `shutdown` fires.
    pub async fn run(
        self,
        app: Router,
        shutdown: Shutdown,
        config_updates: Option<mpsc::UnboundedReceiver<ServiceConfig>>,
    ) -> Result<(), ServiceError> {
        let server = self.http_server(app)?;
        let tasks = self.spawn_background(&shutdown, config_updates);
        let result = server.serve(shutdown.subscribe()).await;
        self.finish(tasks, &shutdown, result).await
    }

    /// Run on an already bound listener until `shutdown` fires.
    pub async fn run_on(
        self,
        listener: TcpListener,
        app: Router,
        shutdown: Shutdown,
        config_updates: Option<mpsc::UnboundedReceiver<ServiceConfig>>,
    ) -> Result<(), ServiceError> {
        let server = self.http_server(app)?;
        let tasks = self.spawn_background(&shutdown, config_updates);
        let result = server.run(listener, shutdown.subscribe()).await;
        self.finish(tasks, &shutdown, result).await
    }

    async fn finish(
        self,
        tasks: BackgroundTasks,
        shutdown: &Shutdown,
        result: Result<(), ServiceError>,
    ) -> Result<(), ServiceError> {
        if let Err(e) = &result {
            tracing::error!(error = %e, "HTTP server failed, stopping background tasks");
        }
        // No-op for tasks that already saw the signal
        shutdown.trigger();
        tasks.join(self.config.timeouts.shutdown_grace()).await;
        result
    }
}

/// Handles of the spawned background tasks.
pub struct BackgroundTasks {
    recovery: JoinHandle<()>,
    reload: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Wait for every task to exit, aborting those that overrun `grace`.
    pub async fn join(self, grace: Duration) {
        join_task("recovery", self.recovery, grace).await;
        if let Some(reload) = self.reload {
            join_task("config-reload", reload, grace).await;
        }
    }
}

async fn join_task(name: &'static str, mut handle: JoinHandle<()>, grace: Duration) {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(())) => tracing::debug!(task = name, "Background task stopped"),
        Ok(Err(e)) => tracing::error!(task = name, error = %e, "Background task failed"),
        Err(_) => {
            tracing::warn!(
                task = name,
                grace_secs = grace.as_secs(),
                "Background task overran grace period, aborting"
            );
            handle.abort();
        }
    }
}

async fn apply_reloads(
    trap: Arc<FaultTrap>,
    mut updates: mpsc::UnboundedReceiver<ServiceConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            update = updates.recv() => match update {
                Some(config) => trap.reload(&config.fault_trap),
                None => break,
            },
        }
    }
}
