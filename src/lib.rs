//! Edge relay with origin-assisted cache prefetch.
//!
//! Every GET is relayed to the origin with `CDN-Origin-Assist-Prefetch-Enabled: 1`.
//! Once the client has its response, paths listed by the origin in
//! `CDN-Origin-Assist-Prefetch-Path` are resolved against the request and
//! fetched one by one, purely to warm the cache in front of the origin.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod prefetch;
pub mod relay;
pub mod upstream;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::Relay;
