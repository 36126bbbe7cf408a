//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → probe routes (health::report), or
//!     → fault trap (health::fault) → application routes (routes.rs)
//!     → Send to client
//! ```

pub mod request;
pub mod routes;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use routes::sample_routes;
pub use server::HttpServer;
