//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay + prefetch job produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID is a field on every per-request event
//! - Per-request diagnostics raise prefetch events to info, no global toggle
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
