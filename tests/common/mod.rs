//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sre_probes::config::ServiceConfig;
use sre_probes::health::verify::{from_fn, VerifyError};
use sre_probes::http::sample_routes;
use sre_probes::{HealthState, Service, ServiceError, Shutdown, Verifier};

/// A service running on an ephemeral port.
pub struct TestService {
    pub addr: SocketAddr,
    pub state: Arc<HealthState>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServiceError>>,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the service to return.
    pub async fn stop(self) -> Result<(), ServiceError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("service did not stop")
            .expect("service task panicked")
    }
}

/// Config tuned for tests: one-second recovery ticks, no metrics exporter.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.recovery.interval_secs = 1;
    config.recovery.check_timeout_secs = 1;
    config.observability.metrics_enabled = false;
    config.timeouts.shutdown_grace_secs = 2;
    config
}

/// Start the service with the sample routes and the given verifier.
pub async fn spawn_service(config: ServiceConfig, verifier: Arc<dyn Verifier>) -> TestService {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let service = Service::with_verifier(config, verifier);
    let state = service.state();
    let shutdown = Shutdown::new();

    let run_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        service
            .run_on(listener, sample_routes(), run_shutdown, None)
            .await
    });

    // Accepting starts as soon as the task is polled
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestService {
        addr,
        state,
        shutdown,
        handle,
    }
}

/// Verifier whose verdict follows a shared flag.
pub fn switch_verifier(healthy: Arc<std::sync::atomic::AtomicBool>) -> Arc<dyn Verifier> {
    Arc::new(from_fn("switch", move || {
        let healthy = healthy.clone();
        async move {
            Ok::<_, VerifyError>(healthy.load(std::sync::atomic::Ordering::SeqCst))
        }
    }))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll `url` until it returns `expected` or `deadline` elapses.
pub async fn wait_for_status(
    client: &reqwest::Client,
    url: &str,
    expected: u16,
    deadline: Duration,
) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if let Ok(res) = client.get(url).send().await {
            if res.status().as_u16() == expected {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

/// Start a programmable dependency on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;

                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}
