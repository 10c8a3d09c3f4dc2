//! HTTP client for a single upstream.
//!
//! # Responsibilities
//! - Send a captured request to one upstream with a deadline
//! - Capture the full response body
//! - Record per-upstream request counts and latency
//!
//! # Design Decisions
//! - The hyper client (and its connection pool) is shared and cheap to clone
//! - A missed deadline is its own error variant, the relay answers 504 for it

use std::time::{Duration, Instant};

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::body::CaptureError;
use crate::http::request::ProxyRequest;
use crate::http::response::ProxyResponse;
use crate::observability::metrics;
use crate::upstream::Upstream;

/// Failure talking to an upstream.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to build request for {upstream}: {source}")]
    Build {
        upstream: &'static str,
        #[source]
        source: axum::http::Error,
    },

    #[error("request to {upstream} failed: {source}")]
    Transport {
        upstream: &'static str,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("request to {upstream} timed out after {timeout:?}")]
    Timeout {
        upstream: &'static str,
        timeout: Duration,
    },

    #[error("failed to read response from {upstream}: {source}")]
    Body {
        upstream: &'static str,
        #[source]
        source: CaptureError,
    },
}

/// Sends captured requests to one upstream.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    upstream: Upstream,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl UpstreamClient {
    /// Build a client with its own connection pool.
    pub fn new(upstream: Upstream, connect_timeout: Duration, timeout: Duration, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            upstream,
            client,
            timeout,
            max_body_bytes,
        }
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Replay `request` against this upstream and capture the response.
    ///
    /// The deadline covers the round trip and the body read.
    pub async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse, UpstreamError> {
        let name = self.upstream.name();
        let method = request.method().as_str();

        let outbound = self
            .upstream
            .uri_for(request.target())
            .and_then(|uri| request.to_upstream(uri))
            .map_err(|source| UpstreamError::Build { upstream: name, source })?;

        let start = Instant::now();
        let exchange = async {
            let response = self
                .client
                .request(outbound)
                .await
                .map_err(|source| UpstreamError::Transport { upstream: name, source })?;
            ProxyResponse::capture(response, self.max_body_bytes)
                .await
                .map_err(|source| UpstreamError::Body { upstream: name, source })
        };

        let result = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout {
                upstream: name,
                timeout: self.timeout,
            }),
        };

        match &result {
            Ok(response) => {
                metrics::record_upstream_response(method, name, response.status().as_u16(), start)
            }
            Err(_) => metrics::record_upstream_error(method, name, start),
        }
        result
    }
}
