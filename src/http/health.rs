//! Local handlers for reserved paths.
//!
//! # Responsibilities
//! - `/health`: fixed JSON status, independent of the route table
//! - `/` and `/index.html`: static bootstrap page
//!
//! # Design Decisions
//! - Reserved paths are registered before the catch-all gateway route, so
//!   a misconfigured catch-all can never shadow operational endpoints
//! - These handlers never touch the matcher or the dispatcher

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::Serialize;

use crate::http::server::AppState;

/// Payload of the health endpoint.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    pub timestamp: u64,
}

/// `GET /health` — always 200 while the process is serving.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthStatus {
        status: "Healthy",
        service: state.service_name.clone(),
        timestamp,
    })
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>API Gateway</title>
</head>
<body>
  <h1>API Gateway</h1>
  <p>The gateway is running. Requests to configured routes are forwarded to
  their downstream services.</p>
  <ul>
    <li><a href="/health">Health check</a></li>
  </ul>
</body>
</html>
"#;

/// `GET /` and `GET /index.html` — static bootstrap page, served before
/// any route matching happens.
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
