//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse path templates and check placeholder consistency
//! - Validate downstream authorities (host syntax, port range, scheme)
//! - Detect duplicate routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config
//! - Any violation fails the whole load; a partial route table is never
//!   published
//! - Compilation and validation are one pass: `compile_routes` is the
//!   single source of truth for what a legal route is

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::uri::Authority;
use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouteEntry};
use crate::routing::table::RouteDefinition;
use crate::routing::template::{PathTemplate, TemplateError};

/// One semantic violation found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route {index}: invalid upstream template '{template}': {source}")]
    InvalidUpstreamTemplate {
        index: usize,
        template: String,
        source: TemplateError,
    },

    #[error("route {index}: invalid downstream template '{template}': {source}")]
    InvalidDownstreamTemplate {
        index: usize,
        template: String,
        source: TemplateError,
    },

    #[error("route {index}: downstream placeholder '{{{name}}}' is not bound by the upstream template")]
    UnboundPlaceholder { index: usize, name: String },

    #[error("route {index}: unknown HTTP method '{method}'")]
    UnknownMethod { index: usize, method: String },

    #[error("route {index}: downstream port must be in 1..=65535")]
    InvalidPort { index: usize },

    #[error("route {index}: invalid downstream host '{host}'")]
    InvalidHost { index: usize, host: String },

    #[error("route {index}: unsupported downstream scheme '{scheme}' (expected http or https)")]
    InvalidScheme { index: usize, scheme: String },

    #[error("routes {first} and {second} duplicate methods {methods:?} on upstream template '{template}'")]
    DuplicateRoute {
        first: usize,
        second: usize,
        methods: Vec<String>,
        template: String,
    },

    #[error("invalid listener bind address '{address}'")]
    InvalidBindAddress { address: String },
}

/// Validate a full configuration. Collects every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            address: config.listener.bind_address.clone(),
        });
    }

    if let Err(route_errors) = compile_routes(&config.routes) {
        errors.extend(route_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Compile config route entries into route definitions, validating every
/// invariant along the way. All-or-nothing: any error rejects the whole set.
pub fn compile_routes(entries: &[RouteEntry]) -> Result<Vec<RouteDefinition>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut routes = Vec::with_capacity(entries.len());
    // (sorted method names, upstream template text) → first declaring index
    let mut seen: HashMap<(Vec<String>, String), usize> = HashMap::new();

    for (index, entry) in entries.iter().enumerate() {
        let mut methods_key: Vec<String> = entry
            .upstream_methods
            .iter()
            .map(|m| m.to_ascii_uppercase())
            .collect();
        methods_key.sort();
        methods_key.dedup();

        let key = (methods_key.clone(), entry.upstream_path_template.clone());
        match seen.get(&key) {
            Some(&first) => {
                errors.push(ValidationError::DuplicateRoute {
                    first,
                    second: index,
                    methods: methods_key,
                    template: entry.upstream_path_template.clone(),
                });
                continue;
            }
            None => {
                seen.insert(key, index);
            }
        }

        if let Some(route) = compile_route(entry, index, &mut errors) {
            routes.push(route);
        }
    }

    if errors.is_empty() {
        Ok(routes)
    } else {
        Err(errors)
    }
}

fn compile_route(
    entry: &RouteEntry,
    index: usize,
    errors: &mut Vec<ValidationError>,
) -> Option<RouteDefinition> {
    let before = errors.len();

    let upstream = match PathTemplate::parse(&entry.upstream_path_template) {
        Ok(t) => Some(t),
        Err(source) => {
            errors.push(ValidationError::InvalidUpstreamTemplate {
                index,
                template: entry.upstream_path_template.clone(),
                source,
            });
            None
        }
    };

    let downstream = match PathTemplate::parse(&entry.downstream_path_template) {
        Ok(t) => Some(t),
        Err(source) => {
            errors.push(ValidationError::InvalidDownstreamTemplate {
                index,
                template: entry.downstream_path_template.clone(),
                source,
            });
            None
        }
    };

    // Placeholder subset check: every downstream placeholder must be bound
    // by the upstream template. Checked here, never at request time.
    if let (Some(up), Some(down)) = (&upstream, &downstream) {
        for name in down.placeholders() {
            if !up.placeholders().any(|p| p == name) {
                errors.push(ValidationError::UnboundPlaceholder {
                    index,
                    name: name.to_string(),
                });
            }
        }
    }

    let mut methods = Vec::with_capacity(entry.upstream_methods.len());
    for raw in &entry.upstream_methods {
        match Method::from_bytes(raw.to_ascii_uppercase().as_bytes()) {
            Ok(method) => {
                if !methods.contains(&method) {
                    methods.push(method);
                }
            }
            Err(_) => errors.push(ValidationError::UnknownMethod {
                index,
                method: raw.clone(),
            }),
        }
    }

    if entry.downstream_port == 0 {
        errors.push(ValidationError::InvalidPort { index });
    }

    if entry.downstream_scheme != "http" && entry.downstream_scheme != "https" {
        errors.push(ValidationError::InvalidScheme {
            index,
            scheme: entry.downstream_scheme.clone(),
        });
    }

    let host_ok = !entry.downstream_host.is_empty()
        && !entry.downstream_host.contains('@')
        && format!("{}:{}", entry.downstream_host, entry.downstream_port.max(1))
            .parse::<Authority>()
            .is_ok();
    if !host_ok {
        errors.push(ValidationError::InvalidHost {
            index,
            host: entry.downstream_host.clone(),
        });
    }

    if errors.len() > before {
        return None;
    }

    Some(RouteDefinition {
        // Both templates parsed if we got here without new errors.
        upstream_template: upstream?,
        upstream_methods: methods,
        downstream_template: downstream?,
        downstream_scheme: entry.downstream_scheme.clone(),
        downstream_host: entry.downstream_host.clone(),
        downstream_port: entry.downstream_port,
        index,
    })
}
