//! Elasticsearch sink.
//!
//! # Responsibilities
//! - Probe the cluster at startup so a bad address fails fast
//! - Index each record into a daily index `{prefix}{year}-{month}-{day}` (UTC)
//!
//! # Design Decisions
//! - Plain REST over reqwest; the sink only needs `GET /` and `POST _doc`
//! - Addresses are tried in order; a rejection from a live node is final
//! - Credentials are never logged

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, warn};
use url::Url;

use crate::config::ElasticsearchConfig;
use crate::storage::{MismatchRecord, MismatchSink, SinkError};

/// Name of the index that receives records written on `date`.
pub fn index_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}-{}-{}", date.year(), date.month(), date.day())
}

/// Indexes records over the Elasticsearch REST API.
#[derive(Debug, Clone)]
pub struct ElasticsearchSink {
    client: Client,
    addresses: Vec<Url>,
    index_prefix: String,
    credentials: Credentials,
}

/// Authentication attached to every request. An API key wins over basic auth.
#[derive(Clone)]
enum Credentials {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
}

impl ElasticsearchSink {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, SinkError> {
        let addresses = config
            .addresses
            .iter()
            .map(|a| parse_address(a))
            .collect::<Result<Vec<_>, _>>()?;
        if addresses.is_empty() {
            return Err(SinkError::NoAddress);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            addresses,
            index_prefix: config.index_prefix.clone(),
            credentials: Credentials::from_config(config),
        })
    }

    /// Check that at least one node answers `GET /` successfully.
    pub async fn probe(&self) -> Result<(), SinkError> {
        let mut last_error = SinkError::NoAddress;
        for address in &self.addresses {
            match self.credentials.apply(self.client.get(address.clone())).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(address = %address, "elasticsearch reachable");
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    last_error = SinkError::Rejected { status, body };
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "elasticsearch probe failed");
                    last_error = SinkError::Http(e);
                }
            }
        }
        Err(last_error)
    }

    fn document_url(&self, base: &Url, index: &str) -> Result<Url, SinkError> {
        base.join(&format!("{index}/_doc"))
            .map_err(|e| SinkError::InvalidAddress {
                address: base.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl MismatchSink for ElasticsearchSink {
    async fn store(&self, record: &MismatchRecord) -> Result<(), SinkError> {
        let index = index_name(&self.index_prefix, Utc::now().date_naive());

        let mut last_error = SinkError::NoAddress;
        for address in &self.addresses {
            let url = self.document_url(address, &index)?;
            match self.credentials.apply(self.client.post(url).json(record)).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(SinkError::Rejected { status, body });
                }
                Err(e) => {
                    debug!(address = %address, error = %e, "elasticsearch node unavailable");
                    last_error = SinkError::Http(e);
                }
            }
        }
        Err(last_error)
    }
}

fn parse_address(address: &str) -> Result<Url, SinkError> {
    let invalid = |reason: &str| SinkError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(address).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    // joins below are relative to the base path
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl Credentials {
    fn from_config(config: &ElasticsearchConfig) -> Self {
        if !config.api_key.is_empty() {
            Self::ApiKey(config.api_key.clone())
        } else if !config.username.is_empty() {
            Self::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            }
        } else {
            Self::None
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => request,
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
            Self::ApiKey(key) => request.header(AUTHORIZATION, format!("ApiKey {key}")),
        }
    }
}

// Debug must not print secrets.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}
