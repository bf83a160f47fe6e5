//! Post-response prefetch job.
//!
//! # Responsibilities
//! - Phase 2: turn the primary response's hints into an ordered URL list
//! - Phase 3: fetch those URLs one by one under the [`FetchBudget`]
//! - Drain and discard every warmed body; nothing reaches the client
//!
//! # Design Decisions
//! - Built while the primary response is still in hand, run after it is committed
//! - Strictly sequential: at most one follow-up connection at any instant
//! - Follow-up requests keep the protocol headers so cached copies carry
//!   their own hints, but those hints are not acted on here

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use futures_util::StreamExt;

use crate::http::request_id_of;
use crate::http::response::strip_hop_by_hop;
use crate::observability::metrics;
use crate::prefetch::{extract_hints, FetchBudget, RequestTarget, PREFETCH_PATH_HEADER};
use crate::upstream::{Upstream, UpstreamError};

/// Emit at `info` in diagnostic mode, at `trace` otherwise.
macro_rules! diag {
    ($on:expr, $($arg:tt)+) => {
        if $on {
            tracing::info!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// Result of a single follow-up fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx; body drained.
    Warmed { status: StatusCode, bytes: usize },
    /// Non-success status; response dropped.
    Rejected(StatusCode),
    /// The request never produced a usable response.
    Failed(UpstreamError),
}

impl FetchOutcome {
    fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Warmed { .. } => "warmed",
            FetchOutcome::Rejected(_) => "rejected",
            FetchOutcome::Failed(_) => "failed",
        }
    }
}

/// What a job did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Hints found on the primary response.
    pub hints: usize,
    /// Hints that resolved to a URL.
    pub resolved: usize,
    /// Follow-up fetches attempted (counted against the budget).
    pub attempted: usize,
    /// Attempts that returned a success status.
    pub warmed: usize,
    /// URLs left unfetched because the budget ran out.
    pub truncated: usize,
}

/// Phases 2 and 3 for one inbound request.
pub struct PrefetchJob {
    upstream: Arc<dyn Upstream>,
    method: Method,
    headers: HeaderMap,
    target: RequestTarget,
    origin_headers: HeaderMap,
    budget: FetchBudget,
    request_id: String,
    diagnostics: bool,
}

impl PrefetchJob {
    /// `headers` are the outbound primary request headers, prefetch signal included.
    /// Follow-ups carry no body, so framing and hop-by-hop headers are dropped.
    /// `origin_headers` are the primary response headers the hints are read from.
    pub fn new(
        upstream: Arc<dyn Upstream>,
        method: Method,
        mut headers: HeaderMap,
        target: RequestTarget,
        origin_headers: HeaderMap,
        max_fetches: usize,
        diagnostics: bool,
    ) -> Self {
        let request_id = request_id_of(&headers);
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);

        Self {
            upstream,
            method,
            headers,
            target,
            origin_headers,
            budget: FetchBudget::new(max_fetches),
            request_id,
            diagnostics,
        }
    }

    /// Phase 2: resolve every hint, skipping the ones that do not parse.
    pub fn collect_urls(&self) -> (usize, Vec<Uri>) {
        let hints = extract_hints(&self.origin_headers, &PREFETCH_PATH_HEADER);
        if !hints.is_empty() {
            diag!(
                self.diagnostics,
                request_id = %self.request_id,
                hints = hints.len(),
                "Prefetching"
            );
        }

        let mut urls = Vec::with_capacity(hints.len());
        for hint in &hints {
            match self.target.resolve(hint) {
                Ok(url) => urls.push(url),
                Err(e) => {
                    tracing::warn!(
                        request_id = %self.request_id,
                        hint = %hint,
                        error = %e,
                        "Dropping prefetch hint"
                    );
                    metrics::record_hint_rejected();
                }
            }
        }

        (hints.len(), urls)
    }

    /// Run both phases to completion.
    pub async fn run(mut self) -> PrefetchReport {
        let (hints, urls) = self.collect_urls();
        let mut report = PrefetchReport {
            hints,
            resolved: urls.len(),
            ..PrefetchReport::default()
        };

        for (idx, url) in urls.iter().enumerate() {
            if self.budget.is_exhausted() {
                report.truncated = urls.len() - idx;
                tracing::info!(
                    request_id = %self.request_id,
                    fetched = self.budget.attempted(),
                    skipped = report.truncated,
                    "Backend limit reached, stopping prefetch"
                );
                metrics::record_budget_exhausted();
                break;
            }

            diag!(self.diagnostics, request_id = %self.request_id, url = %url, "Fetching");

            let outcome = self.fetch(url).await;
            self.budget.record_attempt();
            metrics::record_prefetch(outcome.label());

            match &outcome {
                FetchOutcome::Warmed { status, bytes } => {
                    report.warmed += 1;
                    diag!(
                        self.diagnostics,
                        request_id = %self.request_id,
                        url = %url,
                        status = status.as_u16(),
                        bytes,
                        "Prefetch response"
                    );
                }
                FetchOutcome::Rejected(status) => {
                    diag!(
                        self.diagnostics,
                        request_id = %self.request_id,
                        url = %url,
                        status = status.as_u16(),
                        "Prefetch response"
                    );
                }
                FetchOutcome::Failed(e) => {
                    diag!(
                        self.diagnostics,
                        request_id = %self.request_id,
                        url = %url,
                        error = %e,
                        "Prefetch failed"
                    );
                }
            }
        }

        report.attempted = self.budget.attempted();
        tracing::debug!(
            request_id = %self.request_id,
            hints = report.hints,
            resolved = report.resolved,
            attempted = report.attempted,
            warmed = report.warmed,
            truncated = report.truncated,
            "Prefetch finished"
        );
        report
    }

    async fn fetch(&self, url: &Uri) -> FetchOutcome {
        let request = match self.build_request(url) {
            Ok(request) => request,
            Err(e) => return FetchOutcome::Failed(e),
        };

        let response = match self.upstream.send(request).await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Failed(e),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::Rejected(status);
        }

        let mut stream = response.into_body().into_data_stream();
        let mut bytes = 0;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => bytes += chunk.len(),
                Err(e) => return FetchOutcome::Failed(UpstreamError::Transport(Box::new(e))),
            }
        }

        FetchOutcome::Warmed { status, bytes }
    }

    /// Clone of the primary request head aimed at `url`.
    fn build_request(&self, url: &Uri) -> Result<Request<Body>, UpstreamError> {
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(url.clone());

        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
            if let Some(host) = url
                .authority()
                .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
            {
                headers.insert(header::HOST, host);
            }
        }

        Ok(builder.body(Body::empty())?)
    }
}
