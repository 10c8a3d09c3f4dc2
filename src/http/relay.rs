//! Primary request relay.
//!
//! # Responsibilities
//! - Capture the inbound request once
//! - Forward it to the primary upstream and capture the answer
//! - Build the client response from the captured primary response
//! - Sample and hand shadow work to the job queue
//!
//! # Design Decisions
//! - The client only ever sees the primary's answer or a proxy error status
//! - Shadow submission happens after the response is built, so a shadow
//!   failure cannot alter it; a full queue delays the response (backpressure)
//! - No retries: the primary call is attempted once

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tracing::{error, info, warn};

use crate::http::body::CaptureError;
use crate::http::request::{ProxyRequest, X_REQUEST_ID};
use crate::http::response::ProxyResponse;
use crate::observability::metrics;
use crate::sampling::SamplingPolicy;
use crate::shadow::{JobQueue, ShadowComparisonJob, ShadowContext};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Why the relay could not produce the primary's response.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to read request body: {0}")]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Capture(CaptureError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Capture(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(UpstreamError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}

/// Request handler state shared by every connection.
#[derive(Clone)]
pub struct RequestRelay {
    primary: UpstreamClient,
    sampler: Arc<dyn SamplingPolicy>,
    queue: JobQueue,
    shadow: Arc<ShadowContext>,
    max_request_body_bytes: usize,
}

impl RequestRelay {
    pub fn new(
        primary: UpstreamClient,
        sampler: Arc<dyn SamplingPolicy>,
        queue: JobQueue,
        shadow: Arc<ShadowContext>,
        max_request_body_bytes: usize,
    ) -> Self {
        Self {
            primary,
            sampler,
            queue,
            shadow,
            max_request_body_bytes,
        }
    }

    /// Relay one client request.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response<Body>, RelayError> {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let method = request.method().clone();

        // 1. Capture the inbound body
        let request = match ProxyRequest::capture(request, self.max_request_body_bytes).await {
            Ok(request) => Arc::new(request),
            Err(e) => {
                warn!(request_id = %request_id, method = %method, error = %e, "failed to read request body");
                return Err(e.into());
            }
        };

        // 2. Primary round trip, response fully captured
        let primary = match self.primary.send(&request).await {
            Ok(response) => Arc::new(response),
            Err(e) => {
                error!(
                    request_id = %request_id,
                    method = %method,
                    url = request.target(),
                    error = %e,
                    "primary upstream failed"
                );
                return Err(e.into());
            }
        };

        // 3. Client response from the captured bytes
        let response = primary.to_client_response();

        // 4. Shadow
        self.shadow(&request_id, request, primary).await;

        Ok(response)
    }

    async fn shadow(&self, request_id: &str, request: Arc<ProxyRequest>, primary: Arc<ProxyResponse>) {
        let shadowed = self.sampler.decide();
        metrics::record_sampling_decision(shadowed);
        if !shadowed {
            info!(request_id, url = request.target(), "request not shadowed");
            return;
        }

        let job = ShadowComparisonJob::new(request, primary, self.shadow.clone());
        if let Err(e) = self.queue.submit(Box::new(job)).await {
            warn!(request_id, error = %e, "failed to enqueue shadow job");
        }
    }
}
