//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the upstream clients, sampler, worker pool and relay from config
//! - Create the Axum router: every method and path goes to the relay
//! - Wire up middleware (request ID, tracing, body read timeout)
//! - Serve until shutdown, then drain requests and stop the workers

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::RequestBodyTimeoutLayer;

use crate::compare::SkipPathError;
use crate::config::ProxyConfig;
use crate::http::relay::{RelayError, RequestRelay};
use crate::http::request::UuidRequestId;
use crate::lifecycle::Shutdown;
use crate::observability::trace::http_trace_layer;
use crate::sampling::{self, SamplingError};
use crate::shadow::{ShadowContext, WorkerPool};
use crate::storage::MismatchSink;
use crate::upstream::{AddressError, Upstream, UpstreamClient, PRIMARY, SECONDARY};

/// Config that passed validation but still cannot be turned into a server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid upstream: {0}")]
    Upstream(#[from] AddressError),

    #[error("invalid skip path: {0}")]
    SkipPath(#[from] SkipPathError),

    #[error("invalid sampling settings: {0}")]
    Sampling(#[from] SamplingError),
}

/// HTTP server for the shadowing proxy.
pub struct HttpServer {
    router: Router,
    pool: WorkerPool,
    workers_shutdown: Shutdown,
    grace: Duration,
}

impl HttpServer {
    /// Create the server and start its shadow workers.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: &ProxyConfig, sink: Arc<dyn MismatchSink>) -> Result<Self, ServerError> {
        let connect = Duration::from_secs(config.timeouts.connect_secs);
        let primary = UpstreamClient::new(
            Upstream::parse(PRIMARY, &config.upstreams.primary.address)?,
            connect,
            Duration::from_secs(config.timeouts.request_secs),
            config.limits.max_response_body_bytes,
        );
        let secondary = UpstreamClient::new(
            Upstream::parse(SECONDARY, &config.upstreams.secondary.address)?,
            connect,
            Duration::from_secs(config.timeouts.shadow_secs),
            config.limits.max_response_body_bytes,
        );

        let sampler = sampling::from_config(&config.sampling)?;
        let shadow = Arc::new(ShadowContext::new(secondary, &config.comparison, sink)?);

        let workers_shutdown = Shutdown::new();
        let (pool, queue) = WorkerPool::start(
            config.workers.count,
            config.workers.queue_capacity,
            &workers_shutdown,
        );

        let relay = RequestRelay::new(
            primary,
            sampler,
            queue,
            shadow,
            config.limits.max_request_body_bytes,
        );

        Ok(Self {
            router: Self::build_router(config, relay),
            pool,
            workers_shutdown,
            grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, relay: RequestRelay) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(relay)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(http_trace_layer())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// Serve on `listener` until `shutdown` completes.
    ///
    /// In-flight requests finish (and may still enqueue shadow jobs) before
    /// the workers are told to stop.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;
        tracing::info!("HTTP server stopped");

        self.workers_shutdown.trigger();
        self.pool.shutdown(self.grace).await;

        served
    }
}

async fn proxy_handler(
    State(relay): State<RequestRelay>,
    request: Request<Body>,
) -> Result<Response<Body>, RelayError> {
    relay.handle(request).await
}
