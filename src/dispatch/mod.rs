// src/dispatch/mod.rs

//! Job dispatch abstraction.
//!
//! The mode controller talks to a `JobDispatcher` instead of a concrete
//! backend. This makes it easy to swap in a recording dispatcher in tests
//! while keeping the production implementations here.
//!
//! - [`EagerDispatcher`] runs the job in-process before `submit` returns
//!   (`--debug`). Errors keep their original type and context.
//! - [`QueueDispatcher`] publishes the job on the spool and returns at once
//!   with a handle that can be awaited.
//!
//! Which one is used is decided once, in [`dispatcher_for`].

pub mod eager;
pub mod handle;
pub mod queue;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::backend::{JobInput, JobPayload};
use crate::config::RunConfiguration;
use crate::context::{AppContext, StdinSource};
use crate::errors::Result;
use crate::types::InputSource;

pub use eager::EagerDispatcher;
pub use handle::JobHandle;
pub use queue::QueueDispatcher;

/// Trait abstracting how pipeline jobs are submitted.
///
/// Production code uses [`EagerDispatcher`] or [`QueueDispatcher`]; tests can
/// provide their own implementation that records submissions.
pub trait JobDispatcher: Send + Sync {
    /// Submit exactly one job for the process-wide configuration.
    ///
    /// No retries happen here; retry policy belongs to whoever runs the job.
    fn submit<'a>(
        &'a self,
        input: Option<&'a InputSource>,
    ) -> Pin<Box<dyn Future<Output = Result<JobHandle>> + Send + 'a>>;
}

/// Pick the dispatcher for this process: eager under `--debug`, queued
/// otherwise.
pub fn dispatcher_for(ctx: &AppContext) -> Result<Arc<dyn JobDispatcher>> {
    if ctx.config().debug() {
        info!("debug mode: all jobs execute locally in this process");
        Ok(Arc::new(EagerDispatcher::new(ctx.clone(), ctx.job_runner()?)))
    } else {
        Ok(Arc::new(QueueDispatcher::new(ctx.clone(), ctx.queue())))
    }
}

/// Build the payload for one submission: the flattened configuration plus
/// the input, with stdin read eagerly so the payload never holds a stream.
pub async fn build_payload(
    config: &RunConfiguration,
    input: Option<&InputSource>,
    stdin: &StdinSource,
) -> Result<JobPayload> {
    let input = match input {
        None => JobInput::None,
        Some(InputSource::Path(p)) => JobInput::Path(p.clone()),
        Some(InputSource::Stdin) => {
            let text = match stdin {
                StdinSource::Process => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
                StdinSource::Fixed(text) => text.clone(),
            };
            debug!(bytes = text.len(), "read job input from stdin");
            JobInput::Inline(text)
        }
    };
    Ok(JobPayload::new(config, input))
}
