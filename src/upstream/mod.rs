//! Upstream (origin) access.
//!
//! # Data Flow
//! ```text
//! relay / prefetch job
//!     → Upstream::send(Request<Body>)      (path, query and Host taken from the request)
//!     → client.rs rewrites scheme + authority to the origin address
//!     → hyper-util pooled client
//!     → Response<Body> | UpstreamError
//! ```
//!
//! # Design Decisions
//! - One named upstream; callers never pick an address
//! - Trait seam so the relay can be driven without a network in tests
//! - No retries: a failed send is reported once

pub mod client;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use thiserror::Error;

pub use client::OriginClient;

/// Boxed error from the transport layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by [`Upstream::send`].
pub type UpstreamFuture<'a> = BoxFuture<'a, Result<Response<Body>, UpstreamError>>;

/// Errors from sending a request to the origin.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid origin address: {0}")]
    InvalidOrigin(#[from] axum::http::uri::InvalidUri),

    #[error("invalid upstream target: {0}")]
    InvalidTarget(#[from] axum::http::Error),

    #[error("origin request failed: {0}")]
    Transport(#[source] BoxError),
}

/// The "send request to named upstream" primitive.
pub trait Upstream: Send + Sync + 'static {
    fn send(&self, request: Request<Body>) -> UpstreamFuture<'_>;
}

#[cfg(test)]
pub(crate) mod stub {
    //! Recording upstream for unit tests.

    use super::*;
    use axum::http::{HeaderMap, Method, Uri};
    use std::sync::Mutex;

    /// A request as seen by the stub.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub uri: Uri,
        pub headers: HeaderMap,
    }

    type Responder =
        Box<dyn Fn(&RecordedRequest) -> Result<Response<Body>, UpstreamError> + Send + Sync>;

    pub struct StubUpstream {
        calls: Mutex<Vec<RecordedRequest>>,
        responder: Responder,
    }

    impl StubUpstream {
        pub fn new<F>(responder: F) -> Self
        where
            F: Fn(&RecordedRequest) -> Result<Response<Body>, UpstreamError> + Send + Sync + 'static,
        {
            Self {
                calls: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            }
        }

        pub fn calls(&self) -> Vec<RecordedRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Upstream for StubUpstream {
        fn send(&self, request: Request<Body>) -> UpstreamFuture<'_> {
            let recorded = RecordedRequest {
                method: request.method().clone(),
                uri: request.uri().clone(),
                headers: request.headers().clone(),
            };
            self.calls.lock().unwrap().push(recorded.clone());
            let result = (self.responder)(&recorded);
            Box::pin(async move { result })
        }
    }

    /// A transport failure as produced by a refused connection.
    pub fn refused() -> UpstreamError {
        UpstreamError::Transport(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    pub fn ok(body: &'static str) -> Response<Body> {
        Response::new(Body::from(body))
    }

    pub fn status(code: u16) -> Response<Body> {
        Response::builder()
            .status(code)
            .body(Body::empty())
            .unwrap()
    }
}
