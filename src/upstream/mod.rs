//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyRequest (captured)
//!     → Upstream (base URL + original path and query)
//!     → client.rs (hyper client, deadline, metrics)
//!     → ProxyResponse (captured)
//! ```
//!
//! # Design Decisions
//! - Exactly two upstreams: `primary` answers clients, `secondary` is only compared
//! - Base addresses are parsed once at startup; a base path is a prefix
//! - Transport failures are typed so the relay can map them to 502/504

pub mod client;

use axum::http::uri::{PathAndQuery, Scheme};
use axum::http::Uri;

pub use client::{UpstreamClient, UpstreamError};

/// Label of the production upstream in logs and metrics.
pub const PRIMARY: &str = "primary";
/// Label of the candidate upstream in logs and metrics.
pub const SECONDARY: &str = "secondary";

/// Why an upstream address was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("`{0}` is not a valid URI")]
    Malformed(String),

    #[error("`{0}` must use http or https")]
    UnsupportedScheme(String),

    #[error("`{0}` has no host")]
    MissingHost(String),

    #[error("`{0}` must not carry a query string")]
    QueryNotAllowed(String),
}

/// A parsed upstream base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    name: &'static str,
    base: Uri,
}

impl Upstream {
    /// Parse `address`; a bare `host:port` is treated as `http://host:port`.
    pub fn parse(name: &'static str, address: &str) -> Result<Self, AddressError> {
        let address = address.trim();
        let candidate = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let base: Uri = candidate
            .parse()
            .map_err(|_| AddressError::Malformed(address.to_string()))?;

        match base.scheme() {
            Some(s) if *s == Scheme::HTTP || *s == Scheme::HTTPS => {}
            _ => return Err(AddressError::UnsupportedScheme(address.to_string())),
        }
        if base.authority().is_none() {
            return Err(AddressError::MissingHost(address.to_string()));
        }
        if base.query().is_some() {
            return Err(AddressError::QueryNotAllowed(address.to_string()));
        }

        Ok(Self { name, base })
    }

    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base(&self) -> &Uri {
        &self.base
    }

    /// Full URI for an inbound path and query, e.g. `/api/test?x=1`.
    pub fn uri_for(&self, target: &str) -> Result<Uri, axum::http::Error> {
        let prefix = self.base.path().trim_end_matches('/');
        let path_and_query: PathAndQuery = format!("{prefix}{target}").parse()?;

        let mut parts = self.base.clone().into_parts();
        parts.path_and_query = Some(path_and_query);
        Ok(Uri::from_parts(parts)?)
    }
}
