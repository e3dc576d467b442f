//! API gateway routing engine.
//!
//! Accepts inbound HTTP requests, matches them against a declarative route
//! table, rewrites them per the matched route, and forwards them to the
//! configured downstream service with timeouts and bounded retries.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
