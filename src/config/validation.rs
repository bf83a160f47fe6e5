//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, header names and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::prefetch::OUTBOUND_CALL_CEILING;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidSocketAddress { field: &'static str, value: String },

    #[error("origin.address: `{0}` is not a host:port authority")]
    InvalidOriginAddress(String),

    #[error("relay.public_scheme: `{0}` must be http or https")]
    InvalidScheme(String),

    #[error("relay.diagnostics_header: `{0}` is not a valid header name")]
    InvalidHeaderName(String),

    #[error("prefetch.max_fetches: {0} must be between 1 and {max}", max = OUTBOUND_CALL_CEILING - 1)]
    BudgetOutOfRange(usize),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.origin.address.is_empty() || config.origin.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::InvalidOriginAddress(config.origin.address.clone()));
    }

    if !matches!(config.relay.public_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::InvalidScheme(config.relay.public_scheme.clone()));
    }

    if HeaderName::from_bytes(config.relay.diagnostics_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(
            config.relay.diagnostics_header.clone(),
        ));
    }

    // The primary fetch needs one of the outbound calls.
    if config.prefetch.max_fetches == 0 || config.prefetch.max_fetches >= OUTBOUND_CALL_CEILING {
        errors.push(ValidationError::BudgetOutOfRange(config.prefetch.max_fetches));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
