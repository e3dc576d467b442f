//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route compilation)
//!     → GatewayConfig (validated, immutable)
//!     → compiled routes published as route table generation 1
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the active route table generation
//!     → in-flight requests keep their old snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields except routes have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A reload that fails validation is rejected whole; the running table
//!   is never mixed with new entries

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{GatewayConfig, ListenerConfig, ObservabilityConfig, RetryConfig, RetryOn, RouteEntry, TimeoutConfig};
pub use validation::{compile_routes, validate_config, ValidationError};
