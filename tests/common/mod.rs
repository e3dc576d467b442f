//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a simple mock downstream that returns a fixed 200 response.
#[allow(dead_code)]
pub async fn start_mock_downstream(addr: SocketAddr, response: &'static str) {
    start_programmable_downstream(addr, move |_req| async move {
        (200, response.to_string())
    })
    .await;
}

/// Start a mock downstream that drains request bodies and counts their bytes.
///
/// Returns the shared byte counter. The server reads `Content-Length` from the
/// request head, consumes exactly that many body bytes, and replies 200.
#[allow(dead_code)]
pub async fn start_body_counting_downstream(addr: SocketAddr) -> Arc<AtomicUsize> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_out = counter.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 4096];
                        let head_end = loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) => return,
                                Ok(n) => {
                                    buf.extend_from_slice(&chunk[..n]);
                                    if let Some(pos) =
                                        buf.windows(4).position(|w| w == b"\r\n\r\n")
                                    {
                                        break pos + 4;
                                    }
                                }
                                Err(_) => return,
                            }
                        };

                        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                        let content_length: usize = head
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse().ok())?
                            })
                            .unwrap_or(0);

                        let mut body_read = buf.len() - head_end;
                        while body_read < content_length {
                            match socket.read(&mut chunk).await {
                                Ok(0) => break,
                                Ok(n) => body_read += n,
                                Err(_) => break,
                            }
                        }
                        counter.fetch_add(body_read, Ordering::SeqCst);

                        let response =
                            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    counter_out
}

/// First line of an HTTP request as seen by a mock downstream.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
}

/// Start a programmable mock downstream.
///
/// Reads the request head, hands the request line to `f`, and writes back
/// whatever status and body `f` returns.
pub async fn start_programmable_downstream<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Read until the end of headers; bodies are ignored.
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) => break,
                                Ok(n) => {
                                    buf.extend_from_slice(&chunk[..n]);
                                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                        break;
                                    }
                                }
                                Err(_) => return,
                            }
                        }

                        let head = String::from_utf8_lossy(&buf);
                        let mut parts = head.lines().next().unwrap_or("").split_whitespace();
                        let seen = SeenRequest {
                            method: parts.next().unwrap_or("").to_string(),
                            path: parts.next().unwrap_or("").to_string(),
                        };

                        let (status, body) = f(seen).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
