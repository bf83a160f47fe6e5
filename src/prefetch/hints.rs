//! Prefetch hint extraction.
//!
//! Every occurrence of the hint header is honored, each value is split on
//! commas, and entries keep their order: header occurrence first, then left to
//! right inside a value. That order is the fetch order, so it decides what gets
//! warmed when the budget runs out.

use axum::http::{HeaderMap, HeaderName};

/// Collect trimmed, non-empty hint strings from all `name` headers.
pub fn extract_hints(headers: &HeaderMap, name: &HeaderName) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .flat_map(|value| {
            String::from_utf8_lossy(value.as_bytes())
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}
