use async_trait::async_trait;

/// A unit of background work executed by the worker pool.
///
/// Jobs own their failures: `execute` logs and records whatever goes wrong
/// and never reports back to the submitter.
#[async_trait]
pub trait Job: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    async fn execute(&self);
}
