//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the shadowing proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Primary and secondary upstreams.
    pub upstreams: UpstreamsConfig,

    /// Shadow worker pool sizing.
    pub workers: WorkerConfig,

    /// Share of traffic mirrored to the secondary upstream.
    pub sampling: SamplingConfig,

    /// Response comparison settings.
    pub comparison: ComparisonConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Body size limits.
    pub limits: LimitsConfig,

    /// Mismatch record storage.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9090").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// The two upstreams every request is measured against.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// Production backend, always answers the client.
    pub primary: UpstreamConfig,

    /// Candidate backend, only used for comparison.
    pub secondary: UpstreamConfig,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            primary: UpstreamConfig {
                address: "http://127.0.0.1:8080".to_string(),
            },
            secondary: UpstreamConfig {
                address: "http://127.0.0.1:8081".to_string(),
            },
        }
    }
}

/// A single upstream.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL (e.g., "http://127.0.0.1:8080" or "http://svc/prefix").
    pub address: String,
}

/// Shadow worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of background workers.
    pub count: usize,

    /// Maximum queued shadow jobs before submission blocks.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 50,
            queue_capacity: 2048,
        }
    }
}

/// Sampling algorithm selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicyKind {
    /// Self-correcting weighted bucket.
    #[default]
    Weighted,
    /// Request counter modulo 100.
    Counter,
}

/// Sampling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Target percentage of requests to shadow (0-100).
    pub percentage: u8,

    /// Algorithm used to pick requests.
    pub policy: SamplingPolicyKind,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            percentage: 100,
            policy: SamplingPolicyKind::Weighted,
        }
    }
}

/// Response comparison configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// JSON paths masked before the second comparison pass.
    pub skip_json_paths: Vec<String>,

    /// Report differing `content-type` headers as a mismatch.
    pub compare_headers: bool,

    /// Attach both response bodies to mismatch records.
    pub log_response_payload: bool,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Client-facing request timeout (primary round trip) in seconds.
    pub request_secs: u64,

    /// Deadline for a single shadow call in seconds.
    pub shadow_secs: u64,

    /// Time granted to in-flight shadow jobs on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            shadow_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Body size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound request body size in bytes.
    pub max_request_body_bytes: usize,

    /// Maximum upstream response body size in bytes.
    pub max_response_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 10 * 1024 * 1024,
            max_response_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Where mismatch records go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One JSON line per record on stdout.
    #[default]
    Stdout,
    /// Daily Elasticsearch indices.
    Elasticsearch,
}

/// Mismatch storage configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,

    /// Settings for the Elasticsearch backend.
    pub elasticsearch: ElasticsearchConfig,
}

/// Elasticsearch connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    /// Node URLs, tried in order.
    pub addresses: Vec<String>,

    /// Basic auth user (empty = no basic auth).
    pub username: String,

    /// Basic auth password.
    pub password: String,

    /// API key sent as `Authorization: ApiKey <key>` (empty = none).
    pub api_key: String,

    /// Prepended to the daily index name.
    pub index_prefix: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            addresses: vec!["http://127.0.0.1:9200".to_string()],
            username: String::new(),
            password: String::new(),
            api_key: String::new(),
            index_prefix: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9001".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9090");
        assert_eq!(config.workers.count, 50);
        assert_eq!(config.workers.queue_capacity, 2048);
        assert_eq!(config.sampling.percentage, 100);
        assert_eq!(config.sampling.policy, SamplingPolicyKind::Weighted);
        assert_eq!(config.storage.backend, StorageBackend::Stdout);
        assert!(config.comparison.skip_json_paths.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstreams.primary]
            address = "http://main:8080"

            [sampling]
            percentage = 25
            policy = "counter"

            [comparison]
            skip_json_paths = ["meta.timestamp", "items.0.id"]
            log_response_payload = true

            [storage]
            backend = "elasticsearch"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstreams.primary.address, "http://main:8080");
        assert_eq!(config.upstreams.secondary.address, "http://127.0.0.1:8081");
        assert_eq!(config.sampling.percentage, 25);
        assert_eq!(config.sampling.policy, SamplingPolicyKind::Counter);
        assert_eq!(config.comparison.skip_json_paths.len(), 2);
        assert!(config.comparison.log_response_payload);
        assert!(!config.comparison.compare_headers);
        assert_eq!(config.storage.backend, StorageBackend::Elasticsearch);
        assert_eq!(config.storage.elasticsearch.addresses, vec!["http://127.0.0.1:9200"]);
        assert_eq!(config.timeouts.shadow_secs, 30);
    }
}
