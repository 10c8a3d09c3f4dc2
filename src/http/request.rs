//! Captured inbound requests.
//!
//! # Responsibilities
//! - Drain the client request body once, before any upstream call
//! - Keep method, path+query and headers for replay
//! - Build the outbound request for any upstream from the same capture
//!
//! # Design Decisions
//! - A `ProxyRequest` is immutable once built and shared via `Arc` between
//!   the primary path and the shadow job
//! - Each outbound request gets a fresh body from its own cursor

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Uri};
use axum::http::uri::PathAndQuery;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::body::{CaptureError, CapturedBody};
use crate::http::headers;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}

/// A client request whose body has been fully captured.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    target: PathAndQuery,
    headers: HeaderMap,
    body: CapturedBody,
}

impl ProxyRequest {
    /// Capture `request`, draining at most `limit` body bytes.
    pub async fn capture(request: Request<Body>, limit: usize) -> Result<Self, CaptureError> {
        let (parts, body) = request.into_parts();
        let body = CapturedBody::capture(body, limit).await?;
        Ok(Self::from_parts(parts.method, &parts.uri, parts.headers, body))
    }

    /// Build from already-captured pieces.
    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: CapturedBody) -> Self {
        let target = uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        Self {
            method,
            target,
            headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and query as received, e.g. `/api/test?x=1`.
    pub fn target(&self) -> &str {
        self.target.as_str()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &CapturedBody {
        &self.body
    }

    /// Correlation ID assigned at the edge, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// Outbound request to `uri` with a replay of the captured body.
    pub fn to_upstream(&self, uri: Uri) -> Result<Request<Body>, axum::http::Error> {
        let mut cursor = self.body.cursor();
        let mut builder = Request::builder().method(self.method.clone()).uri(uri);
        if let Some(out) = builder.headers_mut() {
            *out = headers::upstream_request_headers(&self.headers);
        }
        builder.body(Body::from(cursor.read_remaining()))
    }
}
