//! hyper-util client bound to the configured origin.

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::{OriginConfig, TimeoutConfig};
use crate::upstream::{Upstream, UpstreamError, UpstreamFuture};

/// Pooled HTTP/1.1 client that sends every request to the origin address.
#[derive(Clone)]
pub struct OriginClient {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl OriginClient {
    pub fn new(origin: &OriginConfig, timeouts: &TimeoutConfig) -> Result<Self, UpstreamError> {
        let authority: Authority = origin.address.parse()?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, authority })
    }

    /// Point the request at the origin, keeping its path, query and headers.
    fn rewrite(&self, request: Request<Body>) -> Result<Request<Body>, UpstreamError> {
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        parts.uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?;

        Ok(Request::from_parts(parts, body))
    }
}

impl Upstream for OriginClient {
    fn send(&self, request: Request<Body>) -> UpstreamFuture<'_> {
        Box::pin(async move {
            let request = self.rewrite(request)?;
            let response: Response<Incoming> = self
                .client
                .request(request)
                .await
                .map_err(|e| UpstreamError::Transport(Box::new(e)))?;
            Ok(response.map(Body::new))
        })
    }
}
