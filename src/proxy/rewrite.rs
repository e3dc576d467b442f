//! Outbound request construction.
//!
//! # Responsibilities
//! - Substitute captured placeholder values into the downstream template
//! - Build the outbound URI from the route's fixed authority
//! - Copy headers, stripping hop-by-hop headers
//! - Pass the body through untouched as an opaque stream
//!
//! # Design Decisions
//! - The query string is forwarded unmodified
//! - Hop-by-hop headers are connection-scoped and invalid to forward
//! - The Host header is rewritten to the downstream authority
//! - Bodies are never parsed or re-serialized; the gateway stays
//!   content-type agnostic

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderValue, Request, Uri};
use thiserror::Error;

use crate::routing::matcher::Bindings;
use crate::routing::table::RouteDefinition;
use crate::routing::template::Segment;

/// Headers meaningful only for a single connection leg.
/// `proxy-connection` is the non-standard companion clients still send.
const HOP_BY_HOP_HEADERS: [&str; 5] = [
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "proxy-connection",
];

/// Rewrite failure. With a validated route table this only fires on
/// authority strings the `http` crate refuses, so it maps to a 502.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("placeholder '{{{0}}}' has no bound value")]
    UnboundPlaceholder(String),

    #[error("failed to build outbound URI: {0}")]
    InvalidUri(#[from] axum::http::Error),

    #[error("invalid outbound URI component: {0}")]
    InvalidUriComponent(#[from] axum::http::uri::InvalidUri),
}

/// Build the downstream path by substituting bindings into the template.
fn substitute_path(route: &RouteDefinition, bindings: &Bindings) -> Result<String, RewriteError> {
    let segments = route.downstream_template.segments();
    if segments.is_empty() {
        return Ok("/".to_string());
    }

    let mut path = String::new();
    for segment in segments {
        path.push('/');
        match segment {
            Segment::Literal(lit) => path.push_str(lit),
            Segment::Placeholder(name) => {
                let value = bindings
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.as_str())
                    .ok_or_else(|| RewriteError::UnboundPlaceholder(name.clone()))?;
                path.push_str(value);
            }
        }
    }
    Ok(path)
}

/// Transform the inbound request into the outbound request for a route.
///
/// Consumes the inbound parts and body; per-request values are owned by the
/// handling task, so nothing here is shared or synchronized.
pub fn rewrite(
    route: &RouteDefinition,
    bindings: &Bindings,
    parts: &Parts,
    body: Body,
) -> Result<Request<Body>, RewriteError> {
    let path = substitute_path(route, bindings)?;

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };

    let scheme = if route.downstream_scheme == "https" {
        Scheme::HTTPS
    } else {
        Scheme::HTTP
    };
    let authority: Authority = route.authority().parse()?;

    let uri = Uri::builder()
        .scheme(scheme)
        .authority(authority.clone())
        .path_and_query(path_and_query.parse::<PathAndQuery>()?)
        .build()?;

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method.clone();
    *outbound.uri_mut() = uri;

    for (name, value) in parts.headers.iter() {
        let skip = name == header::HOST
            || HOP_BY_HOP_HEADERS.iter().any(|h| name.as_str() == *h);
        if !skip {
            outbound.headers_mut().append(name.clone(), value.clone());
        }
    }

    // Downstream services see themselves as the request target.
    if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
        outbound.headers_mut().insert(header::HOST, host);
    }

    Ok(outbound)
}
