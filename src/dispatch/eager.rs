// src/dispatch/eager.rs

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::backend::JobResult;
use crate::context::AppContext;
use crate::dispatch::{JobDispatcher, JobHandle, build_payload};
use crate::errors::Result;
use crate::pipeline::JobRunner;
use crate::types::InputSource;

/// Runs every job in-process before `submit` returns.
///
/// The handle is always terminal. A failing job keeps its original error
/// (lock contention, pipeline exit code, I/O) instead of a flattened message.
#[derive(Debug, Clone)]
pub struct EagerDispatcher {
    ctx: AppContext,
    runner: JobRunner,
}

impl EagerDispatcher {
    pub fn new(ctx: AppContext, runner: JobRunner) -> Self {
        Self { ctx, runner }
    }

    async fn submit_inner(&self, input: Option<&InputSource>) -> Result<JobHandle> {
        let payload = build_payload(self.ctx.config(), input, self.ctx.stdin()).await?;
        info!(job_id = %payload.id, "executing job eagerly");

        let outcome = self
            .runner
            .try_execute(&payload)
            .await
            .map(|()| JobResult::succeeded(payload.id.clone()));
        Ok(JobHandle::completed(payload.id, outcome))
    }
}

impl JobDispatcher for EagerDispatcher {
    fn submit<'a>(
        &'a self,
        input: Option<&'a InputSource>,
    ) -> Pin<Box<dyn Future<Output = Result<JobHandle>> + Send + 'a>> {
        Box::pin(self.submit_inner(input))
    }
}
