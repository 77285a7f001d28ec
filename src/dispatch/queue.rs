// src/dispatch/queue.rs

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::backend::SpoolQueue;
use crate::context::AppContext;
use crate::dispatch::{JobDispatcher, JobHandle, build_payload};
use crate::errors::Result;
use crate::types::InputSource;

/// Publishes jobs on the spool for a worker process to pick up.
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    ctx: AppContext,
    queue: SpoolQueue,
}

impl QueueDispatcher {
    pub fn new(ctx: AppContext, queue: SpoolQueue) -> Self {
        Self { ctx, queue }
    }

    pub fn queue(&self) -> &SpoolQueue {
        &self.queue
    }

    async fn submit_inner(&self, input: Option<&InputSource>) -> Result<JobHandle> {
        let config = self.ctx.config();
        let payload = build_payload(config, input, self.ctx.stdin()).await?;

        self.queue.enqueue(&payload)?;
        debug!(job_id = %payload.id, "returning deferred handle");

        Ok(JobHandle::queued(
            payload.id,
            self.queue.clone(),
            config.poll_interval(),
            config.job_timeout(),
        ))
    }
}

impl JobDispatcher for QueueDispatcher {
    fn submit<'a>(
        &'a self,
        input: Option<&'a InputSource>,
    ) -> Pin<Box<dyn Future<Output = Result<JobHandle>> + Send + 'a>> {
        Box::pin(self.submit_inner(input))
    }
}
