// src/dispatch/handle.rs

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::{JobId, JobResult, SpoolQueue};
use crate::errors::{ForrestError, Result};

/// Reference to a submitted job.
///
/// Either already terminal (eager dispatch) or bound to a job id on the
/// spool. `wait` consumes the handle; dropping it abandons the job without
/// affecting it.
pub struct JobHandle {
    id: JobId,
    state: HandleState,
}

enum HandleState {
    Completed(Result<JobResult>),
    Queued {
        queue: SpoolQueue,
        poll_interval: Duration,
        timeout: Option<Duration>,
    },
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            HandleState::Completed(Ok(_)) => "completed(ok)",
            HandleState::Completed(Err(_)) => "completed(err)",
            HandleState::Queued { .. } => "queued",
        };
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}

impl JobHandle {
    /// Handle for a job that already ran.
    pub fn completed(id: JobId, outcome: Result<JobResult>) -> Self {
        Self {
            id,
            state: HandleState::Completed(outcome),
        }
    }

    /// Handle bound to a job waiting on the spool.
    pub fn queued(
        id: JobId,
        queue: SpoolQueue,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            state: HandleState::Queued {
                queue,
                poll_interval,
                timeout,
            },
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// True when the job has already finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, HandleState::Completed(_))
    }

    /// Block until the job is terminal.
    ///
    /// A failure inside the job comes back as `Err`, so callers can propagate
    /// it with `?`.
    pub async fn wait(self) -> Result<JobResult> {
        let id = self.id;
        match self.state {
            HandleState::Completed(outcome) => outcome.and_then(JobResult::into_result),
            HandleState::Queued {
                queue,
                poll_interval,
                timeout,
            } => {
                let polling = poll_until_done(&queue, &id, poll_interval);
                let result = match timeout {
                    Some(limit) => tokio::time::timeout(limit, polling)
                        .await
                        .map_err(|_| ForrestError::JobTimedOut { id: id.clone() })??,
                    None => polling.await?,
                };
                if let Err(e) = queue.acknowledge(&id) {
                    warn!(job_id = %id, error = %e, "failed to remove job result");
                }
                result.into_result()
            }
        }
    }
}

async fn poll_until_done(
    queue: &SpoolQueue,
    id: &JobId,
    poll_interval: Duration,
) -> Result<JobResult> {
    loop {
        if let Some(result) = queue.poll_result(id)? {
            return Ok(result);
        }
        debug!(job_id = %id, "job not finished yet");
        tokio::time::sleep(poll_interval).await;
    }
}
