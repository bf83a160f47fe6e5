//! Relay orchestration.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → method guard (GET only, 405 otherwise)
//!     → add CDN-Origin-Assist-Prefetch-Enabled: 1
//!     → Upstream::send (502 on transport failure)
//!     → client response: origin status + filtered headers + streamed body
//!     → body end/drop fires the commit signal
//!     → detached PrefetchJob (hints → URLs → budgeted follow-up fetches)
//! ```
//!
//! # Design Decisions
//! - Diagnostics are a per-request flag, never process state
//! - Only Phase 1 failures reach the client
//! - The prefetch task is spawned and forgotten; shutdown may abandon it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{self, InvalidHeaderName};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response};
use tokio::sync::oneshot;

use crate::config::{PrefetchConfig, RelayConfig};
use crate::http::request_id_of;
use crate::http::response::{
    bad_gateway, client_headers, commit_body, method_not_allowed, strip_hop_by_hop,
};
use crate::observability::metrics;
use crate::prefetch::{PrefetchJob, PrefetchReport, RequestTarget, PREFETCH_ENABLED_HEADER};
use crate::upstream::{Upstream, UpstreamError};

/// Result of Phase 1: what the client gets, and what to run once it has it.
pub struct Forwarded {
    pub response: Response<Body>,
    pub prefetch: Option<PendingPrefetch>,
}

impl Forwarded {
    fn immediate(response: Response<Body>) -> Self {
        Self {
            response,
            prefetch: None,
        }
    }
}

/// A prefetch job waiting for the client response to be committed.
pub struct PendingPrefetch {
    job: PrefetchJob,
    committed: oneshot::Receiver<()>,
}

impl PendingPrefetch {
    /// Wait for the commit signal, then run hint collection and follow-up fetches.
    pub async fn run(self) -> PrefetchReport {
        // A dropped sender also means the client side is finished.
        let _ = self.committed.await;
        self.job.run().await
    }
}

/// The per-request relay with origin-assisted prefetch.
pub struct Relay {
    upstream: Arc<dyn Upstream>,
    prefetch: PrefetchConfig,
    public_scheme: String,
    fallback_host: String,
    diagnostics_header: HeaderName,
}

impl Relay {
    pub fn new(upstream: Arc<dyn Upstream>, config: &RelayConfig) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            upstream,
            prefetch: config.prefetch.clone(),
            public_scheme: config.relay.public_scheme.clone(),
            fallback_host: config.origin.address.clone(),
            diagnostics_header: HeaderName::from_bytes(config.relay.diagnostics_header.as_bytes())?,
        })
    }

    fn diagnostics_requested(&self, headers: &HeaderMap) -> bool {
        headers
            .get(&self.diagnostics_header)
            .is_some_and(|value| !value.is_empty())
    }

    /// Relay one request and spawn its prefetch job.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let forwarded = self.forward(request).await;
        if let Some(pending) = forwarded.prefetch {
            tokio::spawn(pending.run());
        }
        forwarded.response
    }

    /// Phase 1. The returned job must not run before the response body is consumed.
    pub async fn forward(&self, request: Request<Body>) -> Forwarded {
        let start = Instant::now();
        let diagnostics = self.diagnostics_requested(request.headers());
        let request_id = request_id_of(request.headers());
        let method = request.method().clone();

        if diagnostics {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            tracing::info!(
                request_id = %request_id,
                version = env!("CARGO_PKG_VERSION"),
                peer = ?peer,
                uri = %request.uri(),
                "Diagnostics enabled"
            );
        }

        if method != Method::GET {
            tracing::debug!(request_id = %request_id, method = %method, "Method not allowed");
            metrics::record_request(method.as_str(), 405, start);
            return Forwarded::immediate(method_not_allowed());
        }

        let (mut parts, body) = request.into_parts();
        let target = RequestTarget::from_parts(&parts, &self.public_scheme, &self.fallback_host);

        strip_hop_by_hop(&mut parts.headers);

        if self.prefetch.enabled {
            parts
                .headers
                .insert(PREFETCH_ENABLED_HEADER, HeaderValue::from_static("1"));
        }
        if !parts.headers.contains_key(header::HOST) {
            if let Ok(host) = HeaderValue::from_str(target.host()) {
                parts.headers.insert(header::HOST, host);
            }
        }

        let response = match self.send_primary(&parts, body).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Origin request failed");
                metrics::record_request(method.as_str(), 502, start);
                return Forwarded::immediate(bad_gateway(&e));
            }
        };

        let (origin, body) = response.into_parts();
        metrics::record_request(method.as_str(), origin.status.as_u16(), start);
        tracing::debug!(
            request_id = %request_id,
            status = origin.status.as_u16(),
            "Origin responded"
        );

        let mut client = Response::new(Body::empty());
        *client.status_mut() = origin.status;
        *client.headers_mut() = client_headers(&origin.headers, diagnostics);

        if !self.prefetch.enabled {
            *client.body_mut() = body;
            return Forwarded::immediate(client);
        }

        let (committed_tx, committed_rx) = oneshot::channel();
        *client.body_mut() = commit_body(body, committed_tx);

        let job = PrefetchJob::new(
            self.upstream.clone(),
            parts.method,
            parts.headers,
            target,
            origin.headers,
            self.prefetch.max_fetches,
            diagnostics,
        );

        Forwarded {
            response: client,
            prefetch: Some(PendingPrefetch {
                job,
                committed: committed_rx,
            }),
        }
    }

    /// The inbound body goes with the primary request, framed by its own `Content-Length`.
    async fn send_primary(&self, parts: &Parts, body: Body) -> Result<Response<Body>, UpstreamError> {
        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(parts.uri.clone());
        if let Some(outbound) = builder.headers_mut() {
            outbound.extend(parts.headers.clone());
        }
        let request = builder.body(body)?;
        self.upstream.send(request).await
    }
}
