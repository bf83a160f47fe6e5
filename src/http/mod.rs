//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace/timeout/request-id layers)
//!     → request.rs (request ID)
//!     → relay (GET guard, origin fetch, prefetch job)
//!     → response.rs (header filtering, commit signal)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id_of, MakeRelayRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
