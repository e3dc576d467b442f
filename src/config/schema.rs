//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Name reported by the health endpoint.
    pub service_name: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for downstream calls.
    pub timeouts: TimeoutConfig,

    /// Retry policy for downstream failures.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions mapping upstream paths to downstream services.
    pub routes: Vec<RouteEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_name: "Gateway".to_string(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            observability: ObservabilityConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
        }
    }
}

/// One route entry as written in the config file.
///
/// Placeholders use `{name}` syntax, e.g. `/api/product/{id}`. Every
/// placeholder used in `downstream_path_template` must appear in
/// `upstream_path_template`; this is enforced at load time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteEntry {
    /// Inbound path template this route accepts.
    pub upstream_path_template: String,

    /// Accepted HTTP methods. Empty (or omitted) means all methods.
    #[serde(default)]
    pub upstream_methods: Vec<String>,

    /// Path template for the outbound request.
    pub downstream_path_template: String,

    /// Scheme of the downstream authority ("http" or "https").
    #[serde(default = "default_scheme")]
    pub downstream_scheme: String,

    /// Fixed downstream host.
    pub downstream_host: String,

    /// Fixed downstream port.
    pub downstream_port: u16,
}

fn default_scheme() -> String {
    "http".to_string()
}

/// Timeout configuration for downstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (full round trip) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Outcomes eligible for retry. Downstream 4xx/5xx replies are never
/// retried; they are final responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryOn {
    /// The downstream did not answer within the request timeout.
    Timeout,
    /// The downstream connection could not be established or failed.
    Unreachable,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds. No growth.
    pub retry_delay_ms: u64,

    /// Which failure outcomes are eligible for retry.
    pub retry_on: Vec<RetryOn>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay_ms: 100,
            retry_on: vec![RetryOn::Timeout, RetryOn::Unreachable],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
