//! Shadow comparison job.
//!
//! # Responsibilities
//! - Replay a captured request against the secondary upstream
//! - Compare status, optionally content type, then body
//! - Store a mismatch record for every divergence
//!
//! # Design Decisions
//! - Every failure ends the job; nothing is retried
//! - The first difference wins: a status mismatch skips the body comparison
//! - Payloads in records are the bodies as received, never the masked copies

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::compare::{self, ContentKind, SkipPathError, SkipPathSet};
use crate::config::ComparisonConfig;
use crate::http::headers;
use crate::http::request::ProxyRequest;
use crate::http::response::ProxyResponse;
use crate::observability::metrics;
use crate::shadow::job::Job;
use crate::shadow::ShadowError;
use crate::storage::{MismatchRecord, MismatchSink};
use crate::upstream::UpstreamClient;

/// What a finished comparison found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Match,
    StatusMismatch,
    ContentTypeMismatch,
    BodyMismatch,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::StatusMismatch => "status_mismatch",
            Self::ContentTypeMismatch => "content_type_mismatch",
            Self::BodyMismatch => "body_mismatch",
        }
    }
}

/// Metric label for jobs that ended in an error.
pub const ABORTED: &str = "aborted";

/// Everything a comparison job shares with every other job.
pub struct ShadowContext {
    secondary: UpstreamClient,
    skip_paths: SkipPathSet,
    compare_headers: bool,
    log_payload: bool,
    sink: Arc<dyn MismatchSink>,
}

impl ShadowContext {
    pub fn new(
        secondary: UpstreamClient,
        config: &ComparisonConfig,
        sink: Arc<dyn MismatchSink>,
    ) -> Result<Self, SkipPathError> {
        Ok(Self {
            secondary,
            skip_paths: SkipPathSet::parse(&config.skip_json_paths)?,
            compare_headers: config.compare_headers,
            log_payload: config.log_response_payload,
            sink,
        })
    }
}

/// Compares the secondary's answer to one request with the primary's.
pub struct ShadowComparisonJob {
    request: Arc<ProxyRequest>,
    primary: Arc<ProxyResponse>,
    ctx: Arc<ShadowContext>,
}

impl ShadowComparisonJob {
    pub fn new(request: Arc<ProxyRequest>, primary: Arc<ProxyResponse>, ctx: Arc<ShadowContext>) -> Self {
        Self {
            request,
            primary,
            ctx,
        }
    }

    /// Run the comparison and store a record on divergence.
    ///
    /// Sink failures are logged here and do not fail the job.
    pub async fn run(&self) -> Result<Outcome, ShadowError> {
        // 1. Replay against the secondary; the request body gets a fresh cursor
        let secondary = self.ctx.secondary.send(&self.request).await?;

        // 2. Compare
        let outcome = self.compare(&secondary)?;
        metrics::record_comparison(outcome.as_str());

        let request_id = self.request.request_id().unwrap_or("-");
        let url = self.request.target();
        let primary_status = self.primary.status().as_u16();
        let secondary_status = secondary.status().as_u16();

        match outcome {
            Outcome::Match => {
                info!(request_id, url, primary_status, "shadow response matched");
                return Ok(outcome);
            }
            Outcome::StatusMismatch => {
                warn!(request_id, url, primary_status, secondary_status, "status code mismatch");
            }
            Outcome::ContentTypeMismatch => {
                warn!(
                    request_id,
                    url,
                    primary_content_type = self.primary.content_type(),
                    secondary_content_type = secondary.content_type(),
                    "content-type mismatch"
                );
            }
            Outcome::BodyMismatch => {
                warn!(request_id, url, primary_status, "response body mismatch");
            }
        }

        // 3. Record
        if let Err(e) = self.ctx.sink.store(&self.record(&secondary)).await {
            metrics::record_sink_error();
            error!(request_id, url, error = %e, "failed to store mismatch record");
        }
        Ok(outcome)
    }

    fn compare(&self, secondary: &ProxyResponse) -> Result<Outcome, ShadowError> {
        if self.primary.status() != secondary.status() {
            return Ok(Outcome::StatusMismatch);
        }
        if self.ctx.compare_headers && self.primary.content_type() != secondary.content_type() {
            return Ok(Outcome::ContentTypeMismatch);
        }

        let kind = ContentKind::from_content_type(self.primary.content_type());
        let equal = compare::compare_bodies(
            kind,
            &self.primary.body().bytes(),
            &secondary.body().bytes(),
            &self.ctx.skip_paths,
        )?;
        Ok(if equal { Outcome::Match } else { Outcome::BodyMismatch })
    }

    fn record(&self, secondary: &ProxyResponse) -> MismatchRecord {
        let payload = |response: &ProxyResponse| {
            self.ctx
                .log_payload
                .then(|| response.body().to_string_lossy())
        };

        MismatchRecord {
            url: self.request.target().to_string(),
            headers: headers::snapshot(self.request.headers()),
            primary_status: self.primary.status().as_u16(),
            secondary_status: secondary.status().as_u16(),
            primary_payload: payload(&self.primary),
            secondary_payload: payload(secondary),
        }
    }
}

#[async_trait]
impl Job for ShadowComparisonJob {
    fn name(&self) -> &'static str {
        "shadow_comparison"
    }

    async fn execute(&self) {
        let Err(e) = self.run().await else { return };

        metrics::record_comparison(ABORTED);
        let request_id = self.request.request_id().unwrap_or("-");
        let url = self.request.target();
        match e {
            ShadowError::Compare(_) => {
                error!(request_id, url, error = %e, "could not verify shadow response")
            }
            _ => warn!(request_id, url, error = %e, "shadow request failed"),
        }
    }
}
