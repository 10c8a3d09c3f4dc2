//! Mismatch storage.
//!
//! # Data Flow
//! ```text
//! ShadowComparisonJob (divergence found)
//!     → MismatchRecord
//!     → MismatchSink::store()
//!         - stdout.rs (one JSON line per record)
//!         - elasticsearch.rs (daily index)
//!         - memory.rs (in-process, tests)
//! ```
//!
//! # Design Decisions
//! - Sinks are shared trait objects built once at startup
//! - Store failures are returned to the job, which logs and drops them
//! - Field names on the wire match the established index mapping

pub mod elasticsearch;
pub mod memory;
pub mod stdout;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{StorageBackend, StorageConfig};

pub use elasticsearch::ElasticsearchSink;
pub use memory::MemorySink;
pub use stdout::StdoutSink;

/// One observed divergence between the two upstreams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchRecord {
    /// Inbound path and query.
    pub url: String,

    /// Request headers as received.
    pub headers: BTreeMap<String, Vec<String>>,

    #[serde(rename = "main_upstream_status_code")]
    pub primary_status: u16,

    #[serde(rename = "test_upstream_status_code")]
    pub secondary_status: u16,

    #[serde(rename = "main_upstream_response_payload")]
    pub primary_payload: Option<String>,

    #[serde(rename = "test_upstream_response_payload")]
    pub secondary_payload: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("elasticsearch request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("elasticsearch rejected record with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid elasticsearch address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("no elasticsearch address accepted the record")]
    NoAddress,
}

/// Destination for mismatch records.
#[async_trait]
pub trait MismatchSink: Send + Sync {
    async fn store(&self, record: &MismatchRecord) -> Result<(), SinkError>;
}

/// Build the sink selected in `config`.
///
/// The Elasticsearch backend is probed before it is returned.
pub async fn build_sink(config: &StorageConfig) -> Result<Arc<dyn MismatchSink>, SinkError> {
    match config.backend {
        StorageBackend::Stdout => Ok(Arc::new(StdoutSink::new())),
        StorageBackend::Elasticsearch => {
            let sink = ElasticsearchSink::new(&config.elasticsearch)?;
            sink.probe().await?;
            Ok(Arc::new(sink))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_index_field_names() {
        let record = MismatchRecord {
            url: "/api/test".into(),
            headers: BTreeMap::from([("accept".into(), vec!["*/*".into()])]),
            primary_status: 200,
            secondary_status: 500,
            primary_payload: None,
            secondary_payload: Some("boom".into()),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "url": "/api/test",
                "headers": {"accept": ["*/*"]},
                "main_upstream_status_code": 200,
                "test_upstream_status_code": 500,
                "main_upstream_response_payload": null,
                "test_upstream_response_payload": "boom"
            })
        );
    }

    #[tokio::test]
    async fn builds_stdout_sink_by_default() {
        assert!(build_sink(&StorageConfig::default()).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_elasticsearch_fails_fast() {
        let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let mut config = StorageConfig::default();
        config.backend = StorageBackend::Elasticsearch;
        config.elasticsearch.addresses = vec![format!("http://{addr}")];
        config.elasticsearch.timeout_secs = 1;
        assert!(build_sink(&config).await.is_err());
    }
}
