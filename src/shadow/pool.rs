//! Bounded job queue and worker pool.
//!
//! # Responsibilities
//! - Hold up to `capacity` pending jobs; submitters wait when it is full
//! - Run `count` long-lived workers that drain the queue
//! - Stop workers on shutdown, giving in-flight jobs a grace period
//!
//! # Design Decisions
//! - One mpsc channel with a shared receiver; whichever worker is idle takes
//!   the next job
//! - Workers check for shutdown before taking a job, never in the middle of one
//! - Jobs still queued at shutdown are dropped
//! - A panicking job is logged and counted as aborted; its worker keeps going

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use futures_util::FutureExt;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::shadow::comparison::ABORTED;
use crate::shadow::job::Job;
use crate::shadow::ShadowError;

type BoxedJob = Box<dyn Job>;
type SharedReceiver = Arc<Mutex<mpsc::Receiver<BoxedJob>>>;

/// Submission side of the job queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<BoxedJob>,
}

impl JobQueue {
    /// Enqueue `job`, waiting while the queue is full.
    pub async fn submit(&self, job: BoxedJob) -> Result<(), ShadowError> {
        let start = Instant::now();
        let result = self.tx.send(job).await.map_err(|_| ShadowError::QueueClosed);
        metrics::record_queue_wait(start.elapsed());
        result
    }

    /// Jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending", &self.pending())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Fixed set of workers draining a [`JobQueue`].
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    queue: JobQueue,
    // keeps the channel open while the pool lives, even with zero workers
    _jobs: SharedReceiver,
}

impl WorkerPool {
    /// Spawn `count` workers and return the pool with its queue.
    ///
    /// `capacity` must be at least 1. A pool with zero workers accepts jobs
    /// until the queue is full and never runs them.
    pub fn start(count: usize, capacity: usize, shutdown: &Shutdown) -> (Self, JobQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let jobs = Arc::new(Mutex::new(rx));

        let workers = (0..count)
            .map(|id| tokio::spawn(worker_loop(id, jobs.clone(), shutdown.subscribe())))
            .collect();

        tracing::info!(workers = count, queue_capacity = capacity, "worker pool started");

        let queue = JobQueue { tx };
        (
            Self {
                workers,
                queue: queue.clone(),
                _jobs: jobs,
            },
            queue,
        )
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wait up to `grace` for workers to stop after the shutdown trigger.
    ///
    /// Workers still running after `grace` are aborted. Returns true if every
    /// worker stopped on its own. The queue closes once the pool is gone.
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        let abandoned = self.queue.pending();
        let stopped = tokio::time::timeout(grace, join_all(self.workers.iter_mut()))
            .await
            .is_ok();

        if !stopped {
            for worker in &self.workers {
                worker.abort();
            }
            tracing::warn!(grace = ?grace, "workers did not stop in time, aborted");
        }
        if abandoned > 0 {
            tracing::warn!(abandoned, "queued shadow jobs dropped at shutdown");
        }
        tracing::info!("worker pool stopped");
        stopped
    }
}

async fn worker_loop(id: usize, jobs: SharedReceiver, mut shutdown: broadcast::Receiver<()>) {
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            job = next_job(&jobs) => match job {
                Some(job) => job,
                None => break,
            },
        };

        tracing::trace!(worker = id, job = job.name(), "job started");
        run_guarded(id, job.as_ref()).await;
    }
    tracing::debug!(worker = id, "worker stopped");
}

async fn next_job(jobs: &Mutex<mpsc::Receiver<BoxedJob>>) -> Option<BoxedJob> {
    jobs.lock().await.recv().await
}

/// Run `job`, turning a panic into a log line instead of a dead worker.
async fn run_guarded(worker: usize, job: &dyn Job) {
    // the job is dropped right after, nothing observes its state past a panic
    if let Err(panic) = AssertUnwindSafe(job.execute()).catch_unwind().await {
        let message = panic
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        metrics::record_comparison(ABORTED);
        tracing::error!(worker, job = job.name(), panic = message, "job panicked");
    }
}
