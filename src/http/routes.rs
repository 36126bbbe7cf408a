//! Sample application routes served by the binary.
//!
//! They stand in for real business handlers and give operators a way to
//! exercise the fault trap against a running instance:
//!
//! - `GET /` answers `ok`
//! - `GET /work?fault=<text>` fails with `<text>` as the fault message
//! - `GET /work?dependency=<name>` fails as a critical dependency fault
//! - `GET /panic` panics inside the handler

use axum::{extract::Query, routing::get, Router};
use serde::Deserialize;

use crate::health::Fault;

#[derive(Debug, Default, Deserialize)]
pub struct WorkParams {
    fault: Option<String>,
    dependency: Option<String>,
}

pub fn sample_routes() -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/work", get(work))
        .route("/panic", get(explode))
}

async fn work(Query(params): Query<WorkParams>) -> Result<&'static str, Fault> {
    match (params.dependency, params.fault) {
        (Some(dependency), fault) => Err(Fault::critical_dependency(
            dependency,
            fault.unwrap_or_else(|| "dependency unavailable".to_string()),
        )),
        (None, Some(fault)) => Err(Fault::new(fault)),
        (None, None) => Ok("done"),
    }
}

async fn explode() -> &'static str {
    panic!("handler panicked on purpose")
}
