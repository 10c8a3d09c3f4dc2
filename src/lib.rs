//! Traffic-shadowing reverse proxy library.

// Core subsystems
pub mod config;
pub mod http;
pub mod upstream;

// Shadow traffic
pub mod compare;
pub mod sampling;
pub mod shadow;
pub mod storage;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
