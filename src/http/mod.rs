//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → relay.rs
//!         → request.rs + body.rs (capture method, target, headers, body)
//!         → primary upstream
//!         → response.rs (captured response, flattened headers via headers.rs)
//!     → Send to client
//!     → relay.rs samples and enqueues the shadow job
//! ```

pub mod body;
pub mod headers;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use body::{BodyCursor, CaptureError, CapturedBody};
pub use relay::{RelayError, RequestRelay};
pub use request::{ProxyRequest, X_REQUEST_ID};
pub use response::ProxyResponse;
pub use server::{HttpServer, ServerError};
