//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (percentages, timeouts, sizes)
//! - Check that addresses and skip paths parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::compare::mask::SkipPath;
use crate::config::schema::{ProxyConfig, StorageBackend};
use crate::upstream::Upstream;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a valid socket address")]
    InvalidSocketAddr { field: &'static str, value: String },

    #[error("{field}: upstream address must not be empty")]
    MissingUpstream { field: &'static str },

    #[error("{field}: {reason}")]
    InvalidUpstream { field: &'static str, reason: String },

    #[error("sampling.percentage: {0} is outside 0..=100")]
    PercentageOutOfRange(u8),

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("comparison.skip_json_paths[{index}]: {reason}")]
    InvalidSkipPath { index: usize, reason: String },

    #[error("storage.elasticsearch.addresses: at least one address is required")]
    MissingElasticsearchAddress,
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_upstream(&mut errors, "upstreams.primary.address", &config.upstreams.primary.address);
    check_upstream(&mut errors, "upstreams.secondary.address", &config.upstreams.secondary.address);

    if config.sampling.percentage > 100 {
        errors.push(ValidationError::PercentageOutOfRange(config.sampling.percentage));
    }

    let positive = [
        ("workers.count", config.workers.count as u64),
        ("workers.queue_capacity", config.workers.queue_capacity as u64),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.shadow_secs", config.timeouts.shadow_secs),
        ("limits.max_request_body_bytes", config.limits.max_request_body_bytes as u64),
        ("limits.max_response_body_bytes", config.limits.max_response_body_bytes as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    for (index, path) in config.comparison.skip_json_paths.iter().enumerate() {
        if let Err(e) = SkipPath::parse(path) {
            errors.push(ValidationError::InvalidSkipPath {
                index,
                reason: e.to_string(),
            });
        }
    }

    if config.storage.backend == StorageBackend::Elasticsearch {
        let elasticsearch = &config.storage.elasticsearch;
        if elasticsearch.addresses.iter().all(|a| a.trim().is_empty()) {
            errors.push(ValidationError::MissingElasticsearchAddress);
        }
        if elasticsearch.timeout_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "storage.elasticsearch.timeout_secs",
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddr {
            field,
            value: value.to_string(),
        });
    }
}

fn check_upstream(errors: &mut Vec<ValidationError>, field: &'static str, address: &str) {
    if address.trim().is_empty() {
        errors.push(ValidationError::MissingUpstream { field });
        return;
    }
    if let Err(e) = Upstream::parse("validation", address) {
        errors.push(ValidationError::InvalidUpstream {
            field,
            reason: e.to_string(),
        });
    }
}
