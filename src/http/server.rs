//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Stop accepting on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderName, Request, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::request::MakeRelayRequestId;
use crate::relay::Relay;
use crate::upstream::{OriginClient, Upstream, UpstreamError};

/// Errors building the server from a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("invalid diagnostics header: {0}")]
    DiagnosticsHeader(#[from] InvalidHeaderName),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// HTTP server for the prefetch relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a server relaying to the configured origin.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let upstream = Arc::new(OriginClient::new(&config.origin, &config.timeouts)?);
        Self::with_upstream(config, upstream)
    }

    /// Create a server relaying to an arbitrary upstream.
    pub fn with_upstream(config: RelayConfig, upstream: Arc<dyn Upstream>) -> Result<Self, ServerError> {
        let relay = Arc::new(Relay::new(upstream, &config)?);
        let router = Self::build_router(&config, AppState { relay });
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(relay_handler))
            .route("/", any(relay_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRelayRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// The configured router, without connection info.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.config.origin.address,
            prefetch_enabled = self.config.prefetch.enabled,
            max_fetches = self.config.prefetch.max_fetches,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every path and method goes through the relay; it rejects non-GET itself.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    state.relay.handle(request).await
}
