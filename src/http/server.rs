//! HTTP server setup and gateway frontend.
//!
//! # Responsibilities
//! - Create the Axum router with reserved paths and the catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Sequence match → rewrite → dispatch → response write-back
//! - Convert every dispatch outcome into exactly one HTTP response
//! - Apply reloaded configurations as new route table generations
//!
//! # Design Decisions
//! - Reserved paths (/health, /, /index.html) are registered before the
//!   catch-all, so they cannot be shadowed by a configured route
//! - The route table is snapshotted once per request; a reload mid-request
//!   leaves that request on its original generation
//! - At most one dispatch call per inbound request; retries live inside
//!   the dispatcher

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::schema::GatewayConfig;
use crate::config::validation::compile_routes;
use crate::http::health::{health_handler, index_handler};
use crate::http::request::{request_id, RequestIdLayer};
use crate::observability::metrics;
use crate::proxy::dispatch::{DispatchOutcome, Dispatcher};
use crate::proxy::rewrite::rewrite;
use crate::routing::table::SharedRouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<SharedRouteTable>,
    pub dispatcher: Dispatcher,
    pub service_name: String,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    table: Arc<SharedRouteTable>,
}

impl HttpServer {
    /// Create a new HTTP server over an already-published route table.
    pub fn new(config: &GatewayConfig, table: Arc<SharedRouteTable>) -> Self {
        let state = AppState {
            table: table.clone(),
            dispatcher: Dispatcher::new(&config.timeouts, &config.retries),
            service_name: config.service_name.clone(),
        };

        let router = Self::build_router(state);
        Self { router, table }
    }

    /// Build the Axum router. Reserved paths first, catch-all last.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/", get(index_handler))
            .route("/index.html", get(index_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until shutdown.
    ///
    /// `config_updates` carries validated reloaded configurations; each one
    /// is compiled and published as a new route table generation. Readers
    /// are never blocked by a swap.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Single writer for route table publishes.
        let table = self.table.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match compile_routes(&config.routes) {
                    Ok(routes) => {
                        let count = routes.len();
                        let generation = table.publish(routes);
                        tracing::info!(generation, routes = count, "Route table swapped");
                    }
                    Err(errors) => {
                        // The watcher validates before sending, so this is a
                        // second line of defense for direct senders.
                        for error in &errors {
                            tracing::error!(%error, "Rejected route in reloaded configuration");
                        }
                        tracing::error!("Reload rejected; keeping current route table");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Gateway frontend handler: match → rewrite → dispatch → write back.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request).to_string();
    let method = request.method().clone();
    let method_str = method.to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Routing request"
    );

    // One snapshot for the whole request lifetime.
    let table = state.table.snapshot();

    let Some(matched) = table.lookup(&method, &path) else {
        tracing::debug!(
            request_id = %request_id,
            path = %path,
            generation = table.generation(),
            "No route matched"
        );
        metrics::record_request(&method_str, 404, "none", start);
        return (StatusCode::NOT_FOUND, "No matching route found").into_response();
    };

    let route_label = matched.route.upstream_template.as_str().to_string();
    let authority = matched.route.authority();

    let (parts, body) = request.into_parts();
    let outbound = match rewrite(matched.route, &matched.bindings, &parts, body) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Request rewrite failed");
            metrics::record_request(&method_str, 502, &route_label, start);
            return (StatusCode::BAD_GATEWAY, "Failed to build downstream request").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        downstream = %outbound.uri(),
        generation = table.generation(),
        "Forwarding request"
    );

    match state.dispatcher.dispatch(outbound).await {
        DispatchOutcome::Success(response) | DispatchOutcome::DownstreamError(response) => {
            // Downstream status passes through verbatim, errors included.
            metrics::record_request(&method_str, response.status().as_u16(), &route_label, start);
            response.into_response()
        }
        DispatchOutcome::Timeout => {
            tracing::warn!(request_id = %request_id, downstream = %authority, "Downstream timed out");
            metrics::record_request(&method_str, 504, &route_label, start);
            (StatusCode::GATEWAY_TIMEOUT, "Downstream request timed out").into_response()
        }
        DispatchOutcome::Unreachable => {
            tracing::warn!(request_id = %request_id, downstream = %authority, "Downstream unreachable");
            metrics::record_request(&method_str, 502, &route_label, start);
            (StatusCode::BAD_GATEWAY, "Downstream unreachable").into_response()
        }
    }
}
