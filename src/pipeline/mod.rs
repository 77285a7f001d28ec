// src/pipeline/mod.rs

//! Pipeline invocation.
//!
//! The orchestrator does not know what a pipeline run does. It only needs a
//! [`Pipeline`] to hand payloads to, and wraps every run in the run lock via
//! [`JobRunner`].
//!
//! - [`command`] provides `CommandPipeline`, which runs a shell command.
//! - Tests provide their own `Pipeline` that records payloads.

pub mod command;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{error, info};

use crate::backend::{JobPayload, JobResult};
use crate::config::RunConfiguration;
use crate::errors::Result;
use crate::lock::LockManager;

pub use command::CommandPipeline;

/// Something that can execute one pipeline job.
pub trait Pipeline: Send + Sync {
    fn run<'a>(
        &'a self,
        payload: &'a JobPayload,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Runs payloads through a [`Pipeline`] while holding the run lock of the
/// payload's watch target.
#[derive(Clone)]
pub struct JobRunner {
    pipeline: Arc<dyn Pipeline>,
    locks: LockManager,
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl JobRunner {
    pub fn new(pipeline: Arc<dyn Pipeline>, locks: LockManager) -> Self {
        Self { pipeline, locks }
    }

    /// Run the job and report the outcome as a `JobResult`.
    pub async fn execute(&self, payload: &JobPayload) -> JobResult {
        match self.try_execute(payload).await {
            Ok(()) => JobResult::succeeded(payload.id.clone()),
            Err(err) => {
                error!(job_id = %payload.id, error = %err, "pipeline job failed");
                JobResult::failed(payload.id.clone(), err.to_string())
            }
        }
    }

    /// Run the job, keeping the original error.
    ///
    /// The lock is released on every path: explicitly here on success and
    /// failure, and by `RunLock`'s drop if this future is cancelled.
    pub async fn try_execute(&self, payload: &JobPayload) -> Result<()> {
        let snapshot = RunConfiguration::from_payload(&payload.config)?;
        let mut lock = self.locks.lock_for_path(snapshot.watch_path());
        lock.acquire(snapshot.force())?;

        info!(job_id = %payload.id, lock_target = %lock.target(), "pipeline started");
        let outcome = self.pipeline.run(payload).await;
        let released = lock.release();

        outcome?;
        released?;
        info!(job_id = %payload.id, "pipeline finished");
        Ok(())
    }
}
