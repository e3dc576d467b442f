//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, reserved paths, gateway handler)
//!     → request.rs (request ID middleware)
//!     → [routing decides the downstream]
//!     → [proxy rewrites and dispatches]
//!     → health.rs (local handlers for /health and the bootstrap page)
//!     → Send to client
//! ```

pub mod health;
pub mod request;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
