//! End-to-end gateway behavior against mock downstream services.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use api_gateway::config::schema::{GatewayConfig, RetryOn, RouteEntry};
use api_gateway::config::validation::compile_routes;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;
use api_gateway::proxy::{DispatchOutcome, Dispatcher};
use api_gateway::routing::table::SharedRouteTable;

mod common;

fn route(upstream: &str, methods: &[&str], downstream: &str, port: u16) -> RouteEntry {
    RouteEntry {
        upstream_path_template: upstream.to_string(),
        upstream_methods: methods.iter().map(|m| m.to_string()).collect(),
        downstream_path_template: downstream.to_string(),
        downstream_scheme: "http".to_string(),
        downstream_host: "127.0.0.1".to_string(),
        downstream_port: port,
    }
}

/// Compile the config, publish the table, and run the gateway on `addr`.
async fn spawn_gateway(
    config: GatewayConfig,
    addr: SocketAddr,
) -> (Shutdown, mpsc::UnboundedSender<GatewayConfig>) {
    let routes = compile_routes(&config.routes).expect("test config must validate");
    let table = Arc::new(SharedRouteTable::new(routes));

    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();

    let server = HttpServer::new(&config, table);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, update_rx, shutdown_rx).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    (shutdown, update_tx)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_proxied_request_passes_through_unchanged() {
    let downstream_addr: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28412".parse().unwrap();

    common::start_programmable_downstream(downstream_addr, |req| async move {
        (200, format!("{{\"id\":7,\"seen\":\"{}\"}}", req.path))
    })
    .await;

    let mut config = GatewayConfig::default();
    config.routes.push(route(
        "/api/product/{id}",
        &["GET"],
        "/api/product/{id}",
        downstream_addr.port(),
    ));
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{gateway_addr}/api/product/7"))
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    // Byte-identical downstream body, and the downstream saw the
    // substituted path.
    assert_eq!(body, "{\"id\":7,\"seen\":\"/api/product/7\"}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_query_string_forwarded_unmodified() {
    let downstream_addr: SocketAddr = "127.0.0.1:28421".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28422".parse().unwrap();

    common::start_programmable_downstream(downstream_addr, |req| async move {
        (200, req.path)
    })
    .await;

    let mut config = GatewayConfig::default();
    config.routes.push(route(
        "/api/products",
        &["GET"],
        "/internal/products",
        downstream_addr.port(),
    ));
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{gateway_addr}/api/products?page=2&sort=price"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "/internal/products?page=2&sort=price");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_path_returns_404() {
    let gateway_addr: SocketAddr = "127.0.0.1:28431".parse().unwrap();

    let mut config = GatewayConfig::default();
    config.routes.push(route(
        "/api/product/{id}",
        &["GET"],
        "/api/product/{id}",
        1,
    ));
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{gateway_addr}/unknown"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // Segment counts are anchored: a bare prefix of a template is a miss.
    let res = client()
        .get(format!("http://{gateway_addr}/api/product"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_timeout_retries_then_504() {
    let downstream_addr: SocketAddr = "127.0.0.1:28441".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28442".parse().unwrap();

    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();
    common::start_programmable_downstream(downstream_addr, move |_req| {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            // Never answer within the gateway's request timeout.
            tokio::time::sleep(Duration::from_secs(5)).await;
            (200, "too late".to_string())
        }
    })
    .await;

    let mut config = GatewayConfig::default();
    config.timeouts.request_secs = 1;
    config.retries.max_retries = 2;
    config.retries.retry_delay_ms = 50;
    config.retries.retry_on = vec![RetryOn::Timeout, RetryOn::Unreachable];
    config.routes.push(route(
        "/api/product/{id}",
        &["GET"],
        "/api/product/{id}",
        downstream_addr.port(),
    ));
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{gateway_addr}/api/product/1"))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
    // Initial attempt plus max_retries.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_downstream_500_passes_through_with_zero_retries() {
    let downstream_addr: SocketAddr = "127.0.0.1:28451".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28452".parse().unwrap();

    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();
    common::start_programmable_downstream(downstream_addr, move |_req| {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            (500, "user service exploded".to_string())
        }
    })
    .await;

    let mut config = GatewayConfig::default();
    config.retries.max_retries = 3;
    config.routes.push(route(
        "/api/user",
        &["POST"],
        "/api/user",
        downstream_addr.port(),
    ));
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    let res = client()
        .post(format!("http://{gateway_addr}/api/user"))
        .body("{\"name\":\"x\"}")
        .send()
        .await
        .unwrap();

    // The downstream's own error is a final response, forwarded verbatim.
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "user service exploded");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_downstream_returns_502() {
    let gateway_addr: SocketAddr = "127.0.0.1:28461".parse().unwrap();

    let mut config = GatewayConfig::default();
    // No retries so the test stays fast; nothing listens on the target port.
    config.retries.max_retries = 0;
    config.routes.push(route("/api/user", &["GET"], "/api/user", 28469));
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{gateway_addr}/api/user"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn test_health_endpoint_bypasses_route_table() {
    let gateway_addr: SocketAddr = "127.0.0.1:28471".parse().unwrap();

    // Empty route table; /health must still answer.
    let config = GatewayConfig::default();
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    let res = client()
        .get(format!("http://{gateway_addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "Healthy");
    assert_eq!(body["service"], "Gateway");
    assert!(body["timestamp"].as_u64().unwrap() > 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_bootstrap_page_served_before_routing() {
    let gateway_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();

    let config = GatewayConfig::default();
    let (shutdown, _) = spawn_gateway(config, gateway_addr).await;

    for path in ["/", "/index.html"] {
        let res = client()
            .get(format!("http://{gateway_addr}{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert!(res.text().await.unwrap().contains("API Gateway"));
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_route_table_reload_swaps_generation() {
    let downstream_addr: SocketAddr = "127.0.0.1:28491".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28492".parse().unwrap();

    common::start_mock_downstream(downstream_addr, "pong").await;

    let mut config = GatewayConfig::default();
    config.routes.push(route(
        "/api/old",
        &["GET"],
        "/api/old",
        downstream_addr.port(),
    ));
    let (shutdown, update_tx) = spawn_gateway(config.clone(), gateway_addr).await;

    let res = client()
        .get(format!("http://{gateway_addr}/api/old"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Swap in a table that only knows the new route.
    config.routes.clear();
    config.routes.push(route(
        "/api/new",
        &["GET"],
        "/api/old",
        downstream_addr.port(),
    ));
    update_tx.send(config).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let res = client()
        .get(format!("http://{gateway_addr}/api/new"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client()
        .get(format!("http://{gateway_addr}/api/old"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_large_idempotent_body_streams_through_intact() {
    let downstream_addr: SocketAddr = "127.0.0.1:28501".parse().unwrap();
    let body_bytes = common::start_body_counting_downstream(downstream_addr).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let config = GatewayConfig::default();
    let dispatcher = Dispatcher::new(&config.timeouts, &config.retries);

    // A GET body above the replay buffer cap: retry-eligible by method, but
    // too big to hold in memory. It must reach the downstream in full.
    let payload = vec![42u8; 2 * 1024 * 1024];
    let expected = payload.len();
    let request = axum::http::Request::builder()
        .method("GET")
        .uri(format!("http://{downstream_addr}/api/product/1"))
        .header("content-length", expected)
        .body(axum::body::Body::from(payload))
        .unwrap();

    let outcome = dispatcher.dispatch(request).await;
    assert!(matches!(outcome, DispatchOutcome::Success(_)));
    assert_eq!(body_bytes.load(Ordering::SeqCst), expected);
}
