//! HTTP request spans.
//!
//! # Responsibilities
//! - One span per inbound request carrying method, URI and request ID
//! - Every log line emitted while relaying inherits those fields
//!
//! # Design Decisions
//! - Built on `tower_http::trace::TraceLayer`; only the span shape is custom
//! - The request ID layer runs first, so the header is always present here

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;

use crate::http::request::X_REQUEST_ID;

/// Span factory that attaches the request ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> tower_http::trace::MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id,
        )
    }
}

/// Trace layer for the proxy router.
pub fn http_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan> {
    TraceLayer::new_for_http().make_span_with(RequestSpan)
}
