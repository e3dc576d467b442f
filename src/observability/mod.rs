//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → structured tracing events (request ID as a field)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging via `tracing`; level from config or `RUST_LOG`
//! - Request ID flows through all subsystems and to the downstream
//! - Metrics are cheap (atomic increments) and optional

pub mod metrics;
