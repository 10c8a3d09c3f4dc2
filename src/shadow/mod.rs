//! Shadow traffic subsystem.
//!
//! # Data Flow
//! ```text
//! RequestRelay (sampled request, primary response captured)
//!     → JobQueue::submit (bounded, waits when full)
//!     → pool.rs worker
//!     → ShadowComparisonJob::execute
//!         → secondary upstream
//!         → compare (status → content-type → body)
//!         → MismatchSink on divergence
//! ```
//!
//! # Design Decisions
//! - Shadow work never touches the client response; it starts after the
//!   primary response is fully captured
//! - Backpressure over dropping: a full queue slows the relay down
//! - At-most-once: a job is attempted once, queued jobs die with the process

pub mod comparison;
pub mod job;
pub mod pool;

use crate::compare::CompareError;
use crate::upstream::UpstreamError;

pub use comparison::{Outcome, ShadowComparisonJob, ShadowContext};
pub use job::Job;
pub use pool::{JobQueue, WorkerPool};

#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
    #[error("shadow job queue is closed")]
    QueueClosed,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Compare(#[from] CompareError),
}
