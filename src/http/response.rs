//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform the origin response for the client
//! - Remove prefetch protocol headers unless diagnostics are on
//! - Signal when the client body has been fully handed to the connection
//! - Map relay failures to client-visible status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - A dropped body counts as committed, so prefetching still runs after a client abort

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, BodyDataStream, Bytes};
use axum::http::{header, HeaderMap, HeaderName, Response, StatusCode};
use futures_util::Stream;
use tokio::sync::oneshot;

use crate::prefetch::{PREFETCH_ENABLED_HEADER, PREFETCH_PATH_HEADER};
use crate::upstream::UpstreamError;

/// Headers managed by each connection, never copied across the relay.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Remove the connection-scoped headers from `headers`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Origin headers as the client should see them.
pub fn client_headers(origin: &HeaderMap, diagnostics: bool) -> HeaderMap {
    let mut headers = origin.clone();
    strip_hop_by_hop(&mut headers);
    if !diagnostics {
        headers.remove(&PREFETCH_ENABLED_HEADER);
        headers.remove(&PREFETCH_PATH_HEADER);
    }
    headers
}

/// Wrap `body` so that `committed` fires once the client stream ends or is dropped.
pub fn commit_body(body: Body, committed: oneshot::Sender<()>) -> Body {
    Body::from_stream(CommitStream {
        inner: body.into_data_stream(),
        committed: Some(committed),
    })
}

struct CommitStream {
    inner: BodyDataStream,
    committed: Option<oneshot::Sender<()>>,
}

impl CommitStream {
    fn commit(&mut self) {
        if let Some(tx) = self.committed.take() {
            let _ = tx.send(());
        }
    }
}

impl Stream for CommitStream {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(None) = poll {
            this.commit();
        }
        poll
    }
}

impl Drop for CommitStream {
    fn drop(&mut self) {
        self.commit();
    }
}

/// 405 for anything but GET.
pub fn method_not_allowed() -> Response<Body> {
    plain_text(StatusCode::METHOD_NOT_ALLOWED, "This method is not allowed\n".to_string())
}

/// 502 carrying the transport error text.
pub fn bad_gateway(error: &UpstreamError) -> Response<Body> {
    plain_text(StatusCode::BAD_GATEWAY, format!("{error}\n"))
}

fn plain_text(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
