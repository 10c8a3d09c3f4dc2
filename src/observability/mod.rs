//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay, upstream clients and shadow workers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → trace.rs (one span per inbound request)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every relay log line
//! - Metrics are cheap (no-op until a recorder is installed)

pub mod logging;
pub mod metrics;
pub mod trace;
