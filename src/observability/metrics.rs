//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (upstream requests, latency, comparison outcomes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `shadow_proxy_http_request_count` (counter): upstream calls by status, method, upstream
//! - `shadow_proxy_http_request_duration_seconds` (histogram): upstream latency by method, upstream
//! - `shadow_proxy_sampling_decisions_total` (counter): shadowed vs skipped requests
//! - `shadow_proxy_comparisons_total` (counter): comparison outcomes
//! - `shadow_proxy_sink_errors_total` (counter): records the sink failed to store
//! - `shadow_proxy_queue_submit_wait_seconds` (histogram): time blocked on a full queue
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps tests free of globals
//! - Histogram buckets span 0.5ms to 30s

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

pub const HTTP_REQUEST_COUNT: &str = "shadow_proxy_http_request_count";
pub const HTTP_REQUEST_DURATION: &str = "shadow_proxy_http_request_duration_seconds";
pub const SAMPLING_DECISIONS: &str = "shadow_proxy_sampling_decisions_total";
pub const COMPARISONS: &str = "shadow_proxy_comparisons_total";
pub const SINK_ERRORS: &str = "shadow_proxy_sink_errors_total";
pub const QUEUE_SUBMIT_WAIT: &str = "shadow_proxy_queue_submit_wait_seconds";

const LATENCY_BUCKETS: [f64; 17] = [
    0.0005, 0.001, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 20.0,
    30.0,
];

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(HTTP_REQUEST_DURATION.to_string()), &LATENCY_BUCKETS)?
        .set_buckets_for_metric(Matcher::Full(QUEUE_SUBMIT_WAIT.to_string()), &LATENCY_BUCKETS)?
        .install()?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed upstream call.
pub fn record_upstream_response(method: &str, upstream: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        HTTP_REQUEST_COUNT,
        "status" => status.to_string(),
        "method" => method.to_string(),
        "upstream" => upstream
    )
    .increment(1);
    record_upstream_latency(method, upstream, start);
}

/// Record an upstream call that failed before a status was received.
pub fn record_upstream_error(method: &str, upstream: &'static str, start: Instant) {
    metrics::counter!(
        HTTP_REQUEST_COUNT,
        "status" => "client_error",
        "method" => method.to_string(),
        "upstream" => upstream
    )
    .increment(1);
    record_upstream_latency(method, upstream, start);
}

fn record_upstream_latency(method: &str, upstream: &'static str, start: Instant) {
    metrics::histogram!(
        HTTP_REQUEST_DURATION,
        "method" => method.to_string(),
        "upstream" => upstream
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_sampling_decision(shadowed: bool) {
    let decision = if shadowed { "shadowed" } else { "skipped" };
    metrics::counter!(SAMPLING_DECISIONS, "decision" => decision).increment(1);
}

/// Record the outcome label of a finished shadow job.
pub fn record_comparison(outcome: &'static str) {
    metrics::counter!(COMPARISONS, "outcome" => outcome).increment(1);
}

pub fn record_sink_error() {
    metrics::counter!(SINK_ERRORS).increment(1);
}

pub fn record_queue_wait(waited: Duration) {
    metrics::histogram!(QUEUE_SUBMIT_WAIT).record(waited.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        let start = Instant::now();
        record_upstream_response("GET", "primary", 200, start);
        record_upstream_error("POST", "secondary", start);
        record_sampling_decision(true);
        record_comparison("match");
        record_sink_error();
        record_queue_wait(Duration::from_millis(3));
    }

    #[test]
    fn buckets_are_sorted() {
        assert!(LATENCY_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }
}
