// src/backend/worker.rs

//! Queue consumer used by worker mode.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::job::JobResult;
use crate::backend::spool::SpoolQueue;
use crate::errors::Result;
use crate::pipeline::JobRunner;

/// Pulls jobs off the spool one at a time and runs them.
#[derive(Debug)]
pub struct Worker {
    queue: SpoolQueue,
    runner: JobRunner,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(queue: SpoolQueue, runner: JobRunner, poll_interval: Duration) -> Self {
        Self {
            queue,
            runner,
            poll_interval,
        }
    }

    /// Consume jobs until `shutdown` fires.
    ///
    /// Spool hiccups are logged and retried on the next poll; they never end
    /// the loop. A job interrupted by shutdown is completed as failed so its
    /// submitter does not wait forever.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.queue.init()?;
        info!(queue = ?self.queue.root(), "worker started; waiting for jobs");

        while !shutdown.is_cancelled() {
            match self.run_one_until(&shutdown).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => warn!(error = %err, "job queue error; retrying"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("worker stopped");
        Ok(())
    }

    /// Claim and run at most one job. Returns `Ok(None)` when the queue is empty.
    pub async fn run_one(&self) -> Result<Option<JobResult>> {
        let Some(payload) = self.queue.claim_next()? else {
            return Ok(None);
        };
        let result = self.runner.execute(&payload).await;
        self.queue.complete(&result)?;
        Ok(Some(result))
    }

    async fn run_one_until(&self, shutdown: &CancellationToken) -> Result<bool> {
        let Some(payload) = self.queue.claim_next()? else {
            return Ok(false);
        };

        info!(job_id = %payload.id, "running job");
        let result = tokio::select! {
            result = self.runner.execute(&payload) => result,
            _ = shutdown.cancelled() => {
                error!(job_id = %payload.id, "worker interrupted while running job");
                JobResult::failed(payload.id.clone(), "worker interrupted")
            }
        };

        self.queue.complete(&result)?;
        Ok(true)
    }
}
