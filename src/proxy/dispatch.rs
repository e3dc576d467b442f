//! Downstream dispatch with timeouts and bounded retries.
//!
//! # Responsibilities
//! - Execute the outbound request against the downstream authority
//! - Enforce connect and request timeouts independently
//! - Retry eligible failures with a fixed delay, capped at max_retries
//! - Classify every attempt into a DispatchOutcome
//!
//! # Design Decisions
//! - Only idempotent methods (GET, HEAD, OPTIONS) are ever retried,
//!   regardless of config; duplicating side-effecting calls is worse than
//!   failing them
//! - A downstream 4xx/5xx is a valid, final response — never retried,
//!   passed through verbatim
//! - Retry delay is fixed, no exponential growth
//! - Idempotent request bodies with a known size within a small cap are
//!   buffered so an attempt can be replayed; streaming or oversized bodies
//!   forward untouched with a single attempt
//! - Dropping the returned future cancels the in-flight downstream call,
//!   so a client disconnect propagates promptly

use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::{HeaderMap, Method, Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::schema::{RetryConfig, RetryOn, TimeoutConfig};

/// Bodies bigger than this are never buffered for replay; the request then
/// gets a single attempt with the body streamed through untouched.
/// Idempotent requests rarely carry bodies at all.
const MAX_REPLAY_BODY_BYTES: u64 = 1024 * 1024;

/// Result of dispatching one outbound request (after retries).
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The downstream replied with a non-error status.
    Success(Response<Body>),
    /// The downstream replied with 4xx/5xx. Final; forwarded verbatim.
    DownstreamError(Response<Body>),
    /// No complete reply within the request timeout.
    Timeout,
    /// The connection could not be established or failed mid-flight.
    Unreachable,
}

impl DispatchOutcome {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Success(_) => "success",
            DispatchOutcome::DownstreamError(_) => "downstream_error",
            DispatchOutcome::Timeout => "timeout",
            DispatchOutcome::Unreachable => "unreachable",
        }
    }

    fn retry_class(&self) -> Option<RetryOn> {
        match self {
            DispatchOutcome::Timeout => Some(RetryOn::Timeout),
            DispatchOutcome::Unreachable => Some(RetryOn::Unreachable),
            _ => None,
        }
    }
}

/// Methods safe to replay against a downstream.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Executes outbound requests. Cheap to clone; the underlying client
/// pools connections.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
    retry_delay: Duration,
    max_retries: u32,
    retry_on: Vec<RetryOn>,
}

impl Dispatcher {
    pub fn new(timeouts: &TimeoutConfig, retries: &RetryConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
            retry_delay: Duration::from_millis(retries.retry_delay_ms),
            max_retries: retries.max_retries,
            retry_on: retries.retry_on.clone(),
        }
    }

    /// Dispatch an outbound request, retrying per policy.
    ///
    /// At most one outcome surfaces per call; exhausted retries return the
    /// last failure unchanged.
    pub async fn dispatch(&self, request: Request<Body>) -> DispatchOutcome {
        let (parts, body) = request.into_parts();
        let method = parts.method;
        let uri = parts.uri;
        let headers = parts.headers;

        let retry_possible =
            is_idempotent(&method) && self.max_retries > 0 && !self.retry_on.is_empty();

        // Replay needs the whole body in memory, so buffering eligibility is
        // decided before the body is consumed: only a known size within the
        // cap qualifies. Streaming or oversized bodies forward as-is with a
        // single attempt, never truncated.
        let buffer_for_replay = retry_possible
            && HttpBody::size_hint(&body)
                .exact()
                .is_some_and(|n| n <= MAX_REPLAY_BODY_BYTES);

        let (replay_body, mut streamed_body) = if buffer_for_replay {
            match axum::body::to_bytes(body, MAX_REPLAY_BODY_BYTES as usize).await {
                Ok(bytes) => (Some(bytes), None),
                Err(e) => {
                    // The inbound body failed mid-read; there is nothing
                    // left to forward.
                    tracing::warn!(uri = %uri, error = %e, "Failed to read request body");
                    return DispatchOutcome::Unreachable;
                }
            }
        } else {
            if retry_possible {
                tracing::debug!(uri = %uri, "Body not replayable; single attempt only");
            }
            (None, Some(body))
        };

        let max_attempts = if replay_body.is_some() {
            self.max_retries + 1
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let attempt_body = match &replay_body {
                Some(bytes) => Body::from(bytes.clone()),
                None => streamed_body.take().unwrap_or_else(Body::empty),
            };
            let request = build_attempt(&method, &uri, &headers, attempt_body);

            let outcome = self.attempt(request).await;

            let retryable = outcome
                .retry_class()
                .is_some_and(|class| self.retry_on.contains(&class));
            if retryable && attempt < max_attempts {
                tracing::info!(
                    uri = %uri,
                    attempt,
                    outcome = outcome.label(),
                    delay = ?self.retry_delay,
                    "Retrying downstream request"
                );
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            return outcome;
        }
    }

    /// One attempt: connect (bounded by the connector timeout) plus round
    /// trip (bounded by the request timeout).
    async fn attempt(&self, request: Request<Body>) -> DispatchOutcome {
        match tokio::time::timeout(self.request_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let response = response.map(Body::new);
                if response.status().is_client_error() || response.status().is_server_error() {
                    DispatchOutcome::DownstreamError(response)
                } else {
                    DispatchOutcome::Success(response)
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Downstream request failed");
                DispatchOutcome::Unreachable
            }
            Err(_) => DispatchOutcome::Timeout,
        }
    }
}

fn build_attempt(method: &Method, uri: &Uri, headers: &HeaderMap, body: Body) -> Request<Body> {
    let mut request = Request::new(body);
    *request.method_mut() = method.clone();
    *request.uri_mut() = uri.clone();
    *request.headers_mut() = headers.clone();
    request
}
