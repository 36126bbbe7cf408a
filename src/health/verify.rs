//! Verification procedures run by the recovery loop.
//!
//! # Responsibilities
//! - Probe downstream dependencies (HTTP, TCP)
//! - Combine several probes into one verdict
//! - Provide the clock-parity simulation for demos
//!
//! # Design Decisions
//! - `Ok(false)` is a negative verdict, `Err` is a fault while verifying;
//!   the recovery loop treats both as "stay degraded"
//! - Verifiers carry no timeout of their own, the loop bounds each attempt

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::net::TcpStream;
use url::Url;

use crate::config::{DependencyConfig, RecoveryConfig};

/// Fault raised while verifying a dependency.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{dependency} unreachable: {reason}")]
    Unreachable { dependency: String, reason: String },

    #[error("invalid target for {dependency}: {reason}")]
    InvalidTarget { dependency: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// A procedure deciding whether the service may become ready again.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn verify(&self) -> Result<bool, VerifyError>;
}

/// Build the verifier described by the recovery configuration.
///
/// With no dependencies configured the verdict is vacuously positive.
pub fn build_verifier(config: &RecoveryConfig) -> Result<Arc<dyn Verifier>, VerifyError> {
    if config.simulate {
        return Ok(Arc::new(ClockParityCheck::new(Duration::from_millis(
            config.simulated_delay_ms,
        ))));
    }

    let checks = config
        .dependencies
        .iter()
        .map(|dependency| {
            let check: Box<dyn Verifier> = match dependency {
                DependencyConfig::Http { name, url } => Box::new(HttpCheck::new(name, url)?),
                DependencyConfig::Tcp { name, address } => Box::new(TcpCheck::new(name, address)),
            };
            Ok::<_, VerifyError>(check)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Arc::new(CheckAll::new(checks)))
}

/// Healthy when `GET url` returns a 2xx status.
pub struct HttpCheck {
    name: String,
    url: Url,
    client: Client<HttpConnector, Body>,
}

impl HttpCheck {
    pub fn new(name: &str, url: &str) -> Result<Self, VerifyError> {
        let url = Url::parse(url).map_err(|e| VerifyError::InvalidTarget {
            dependency: name.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            name: name.to_string(),
            url,
            client,
        })
    }
}

#[async_trait]
impl Verifier for HttpCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self) -> Result<bool, VerifyError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.url.as_str())
            .header("user-agent", "sre-probes-recovery")
            .body(Body::empty())
            .map_err(|e| VerifyError::InvalidTarget {
                dependency: self.name.clone(),
                reason: e.to_string(),
            })?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| VerifyError::Unreachable {
                dependency: self.name.clone(),
                reason: e.to_string(),
            })?;

        let healthy = response.status().is_success();
        if !healthy {
            tracing::warn!(
                dependency = %self.name,
                url = %self.url,
                status = %response.status(),
                "Dependency check failed: non-success status"
            );
        }
        Ok(healthy)
    }
}

/// Healthy when a TCP connection can be opened.
pub struct TcpCheck {
    name: String,
    address: String,
}

impl TcpCheck {
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}

#[async_trait]
impl Verifier for TcpCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self) -> Result<bool, VerifyError> {
        TcpStream::connect(&self.address)
            .await
            .map(|_| true)
            .map_err(|e| VerifyError::Unreachable {
                dependency: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// Runs every member concurrently; healthy only if all are.
pub struct CheckAll {
    checks: Vec<Box<dyn Verifier>>,
}

impl CheckAll {
    pub fn new(checks: Vec<Box<dyn Verifier>>) -> Self {
        Self { checks }
    }
}

#[async_trait]
impl Verifier for CheckAll {
    fn name(&self) -> &str {
        "all-dependencies"
    }

    async fn verify(&self) -> Result<bool, VerifyError> {
        let results = join_all(self.checks.iter().map(|check| check.verify())).await;

        let mut healthy = true;
        for (check, result) in self.checks.iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::debug!(dependency = check.name(), "Dependency check passed");
                }
                Ok(false) => healthy = false,
                Err(e) => {
                    tracing::warn!(
                        dependency = check.name(),
                        error = %e,
                        "Dependency check errored"
                    );
                    healthy = false;
                }
            }
        }
        Ok(healthy)
    }
}

/// Simulated dependency probe: waits, then passes on even wall-clock seconds.
///
/// Only meant for demos. The verdict flips every second, so it is not
/// deterministic unless a fixed clock is injected.
pub struct ClockParityCheck {
    delay: Duration,
    clock: fn() -> SystemTime,
}

impl ClockParityCheck {
    pub fn new(delay: Duration) -> Self {
        Self::with_clock(delay, SystemTime::now)
    }

    pub fn with_clock(delay: Duration, clock: fn() -> SystemTime) -> Self {
        Self { delay, clock }
    }
}

#[async_trait]
impl Verifier for ClockParityCheck {
    fn name(&self) -> &str {
        "clock-parity"
    }

    async fn verify(&self) -> Result<bool, VerifyError> {
        tokio::time::sleep(self.delay).await;

        let seconds = (self.clock)()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| VerifyError::Other(e.to_string()))?
            .as_secs();
        Ok(seconds % 2 == 0)
    }
}

/// Adapts an async closure into a [`Verifier`].
pub struct FnVerifier<F> {
    name: String,
    f: F,
}

/// Wrap `f` so it can be handed to the recovery loop.
pub fn from_fn<F, Fut>(name: &str, f: F) -> FnVerifier<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, VerifyError>> + Send + 'static,
{
    FnVerifier {
        name: name.to_string(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Verifier for FnVerifier<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, VerifyError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self) -> Result<bool, VerifyError> {
        (self.f)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn fixed(name: &str, verdict: bool) -> Box<dyn Verifier> {
        Box::new(from_fn(name, move || async move { Ok::<_, VerifyError>(verdict) }))
    }

    #[tokio::test]
    async fn test_check_all_requires_every_member() {
        let all_ok = CheckAll::new(vec![fixed("a", true), fixed("b", true)]);
        assert!(all_ok.verify().await.unwrap());

        let one_down = CheckAll::new(vec![fixed("a", true), fixed("b", false)]);
        assert!(!one_down.verify().await.unwrap());

        let one_errors = CheckAll::new(vec![
            fixed("a", true),
            Box::new(from_fn("b", || async {
                Err::<bool, _>(VerifyError::Other("boom".into()))
            })),
        ]);
        assert!(!one_errors.verify().await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_check_all_passes() {
        assert!(CheckAll::new(Vec::new()).verify().await.unwrap());
    }

    #[tokio::test]
    async fn test_tcp_check() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let up = TcpCheck::new("db", &addr.to_string());
        assert!(up.verify().await.unwrap());

        drop(listener);
        let down = TcpCheck::new("db", &addr.to_string());
        assert!(matches!(
            down.verify().await,
            Err(VerifyError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_http_check_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new()
            .route("/up", axum::routing::get(|| async { "ok" }))
            .route(
                "/down",
                axum::routing::get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
            );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let up = HttpCheck::new("api", &format!("http://{}/up", addr)).unwrap();
        assert!(up.verify().await.unwrap());

        let down = HttpCheck::new("api", &format!("http://{}/down", addr)).unwrap();
        assert!(!down.verify().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_parity_with_fixed_clock() {
        fn even() -> SystemTime {
            UNIX_EPOCH + Duration::from_secs(1_700_000_000)
        }
        fn odd() -> SystemTime {
            UNIX_EPOCH + Duration::from_secs(1_700_000_001)
        }

        let delay = Duration::from_secs(1);
        assert!(ClockParityCheck::with_clock(delay, even).verify().await.unwrap());
        assert!(!ClockParityCheck::with_clock(delay, odd).verify().await.unwrap());
    }

    #[test]
    fn test_build_verifier_rejects_bad_url() {
        let config = RecoveryConfig {
            dependencies: vec![DependencyConfig::Http {
                name: "api".into(),
                url: "not a url".into(),
            }],
            ..RecoveryConfig::default()
        };
        assert!(matches!(
            build_verifier(&config),
            Err(VerifyError::InvalidTarget { .. })
        ));
    }
}
