//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): client requests by method, status
//! - `relay_request_duration_seconds` (histogram): time to origin response headers
//! - `prefetch_fetches_total` (counter): follow-up fetches by outcome
//! - `prefetch_hints_rejected_total` (counter): hints that did not resolve
//! - `prefetch_budget_exhausted_total` (counter): jobs cut short by the budget
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_prefetch(outcome: &'static str) {
    counter!("prefetch_fetches_total", "outcome" => outcome).increment(1);
}

pub fn record_hint_rejected() {
    counter!("prefetch_hints_rejected_total").increment(1);
}

pub fn record_budget_exhausted() {
    counter!("prefetch_budget_exhausted_total").increment(1);
}
