//! Origin-assisted prefetch subsystem.
//!
//! # Data Flow
//! ```text
//! Primary response headers (captured before the body is streamed)
//!     → hints.rs (collect every CDN-Origin-Assist-Prefetch-Path value, split, trim)
//!     → resolver.rs (hint → absolute URL carrying the inbound query)
//!     → budget.rs (gate before every follow-up fetch)
//!     → job.rs (sequential follow-up fetches, bodies drained and discarded)
//! ```
//!
//! # Design Decisions
//! - Runs only after the client response has been committed
//! - One fetch at a time; the budget bounds outbound calls per request
//! - Every failure here is logged and absorbed, never surfaced to the client
//! - Hints found on follow-up responses are not followed

pub mod budget;
pub mod hints;
pub mod job;
pub mod resolver;

use axum::http::HeaderName;

pub use budget::FetchBudget;
pub use hints::extract_hints;
pub use job::{FetchOutcome, PrefetchJob, PrefetchReport};
pub use resolver::{RequestTarget, ResolveError};

/// Sent to the origin on the primary request to announce that hints are welcome.
pub const PREFETCH_ENABLED_HEADER: HeaderName =
    HeaderName::from_static("cdn-origin-assist-prefetch-enabled");

/// Returned by the origin, one or more times, listing objects worth warming.
pub const PREFETCH_PATH_HEADER: HeaderName =
    HeaderName::from_static("cdn-origin-assist-prefetch-path");

/// Hard limit on outbound calls a single invocation may make.
pub const OUTBOUND_CALL_CEILING: usize = 32;

/// Follow-up fetches per invocation, leaving headroom under the ceiling.
pub const DEFAULT_MAX_FETCHES: usize = 24;
