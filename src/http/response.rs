//! Captured upstream responses.
//!
//! # Responsibilities
//! - Drain an upstream response fully before anything reaches the client
//! - Keep status, headers and body for the later shadow comparison
//! - Render the client-facing response from the capture
//!
//! # Design Decisions
//! - The client gets exactly the captured bytes, so the comparison sees
//!   what the client saw
//! - Response headers are flattened for the client, see `headers.rs`

use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};

use crate::http::body::{CaptureError, CapturedBody};
use crate::http::headers;

/// An upstream response held in memory.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: CapturedBody,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: CapturedBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Drain an upstream response, reading at most `limit` body bytes.
    pub async fn capture<B>(response: Response<B>, limit: usize) -> Result<Self, CaptureError>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = response.into_parts();
        let body = CapturedBody::capture(body, limit).await?;
        Ok(Self::new(parts.status, parts.headers, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &CapturedBody {
        &self.body
    }

    /// The `content-type` header, empty when absent.
    pub fn content_type(&self) -> &str {
        headers::content_type(&self.headers)
    }

    /// Response for the client: same status, flattened headers, same bytes.
    pub fn to_client_response(&self) -> Response<Body> {
        let mut response = Response::new(self.body.to_body());
        *response.status_mut() = self.status;
        *response.headers_mut() = headers::flatten_response_headers(&self.headers);
        response
    }
}
