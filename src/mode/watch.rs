// src/mode/watch.rs

//! Watch mode: qualifying changes become fire-and-forget job submissions.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::{JobId, JobResult};
use crate::context::AppContext;
use crate::dispatch::JobDispatcher;
use crate::errors::Result;
use crate::mode::ModeOutcome;
use crate::watch::{ChangeEvent, ChangeFilter, RawEvent, WatchLoop};

/// Upper bound on queued jobs whose outcome watch mode waits on for logging.
/// Jobs submitted past it still run; only their outcome goes unlogged.
pub const MAX_TRACKED_JOBS: usize = 64;

/// Watch until `shutdown` fires.
///
/// The watch loop only pushes qualifying changes into a channel; a separate
/// task submits them, so observing events never waits on a job. Outcomes of
/// queued jobs are awaited on background tasks purely for logging, at most
/// [`MAX_TRACKED_JOBS`] at a time. Those tasks stop with the mode.
pub async fn run_watch(
    ctx: &AppContext,
    dispatcher: Arc<dyn JobDispatcher>,
    event_source: Option<mpsc::UnboundedReceiver<RawEvent>>,
    shutdown: CancellationToken,
) -> Result<ModeOutcome> {
    let filter = ChangeFilter::from_config(ctx.config())?;
    let watch_loop = WatchLoop::new(ctx.shared_config(), filter, ctx.fs());

    let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let on_change = move |change: ChangeEvent| {
        // Closed only after the dispatch task has been stopped.
        let _ = trigger_tx.send(change);
    };

    let mut handle = match event_source {
        Some(rx) => watch_loop.start_with_source(rx, on_change),
        None => watch_loop.start(on_change)?,
    };

    let dispatch_task = tokio::spawn(async move {
        let tracking = Arc::new(Semaphore::new(MAX_TRACKED_JOBS));
        // Dropped with this task on shutdown, which aborts every waiter.
        let mut waiters = JoinSet::new();

        while let Some(change) = trigger_rx.recv().await {
            info!(path = ?change.path, kind = ?change.kind, "change detected; dispatching job");
            let job = match dispatcher.submit(None).await {
                Ok(job) => job,
                Err(err) => {
                    error!(error = %err, "failed to dispatch job");
                    continue;
                }
            };

            let id = job.id().clone();
            if job.is_terminal() {
                log_outcome(&id, job.wait().await);
                continue;
            }

            while waiters.try_join_next().is_some() {}
            match Arc::clone(&tracking).try_acquire_owned() {
                Ok(permit) => {
                    info!(job_id = %id, "job submitted");
                    waiters.spawn(async move {
                        let _permit = permit;
                        log_outcome(&id, job.wait().await);
                    });
                }
                Err(_) => warn!(
                    job_id = %id,
                    limit = MAX_TRACKED_JOBS,
                    "job submitted; too many jobs in flight to track its outcome"
                ),
            }
        }
    });

    info!(root = ?ctx.config().watch_path(), "watching for changes; interrupt to stop");
    shutdown.cancelled().await;

    info!("interrupt received; stopping watcher");
    handle.cancel().await;

    // Aborting drops an eager job mid-run, which releases its lock.
    dispatch_task.abort();
    if let Err(err) = dispatch_task.await {
        if !err.is_cancelled() {
            warn!(error = %err, "dispatch task ended abnormally");
        }
    }

    Ok(ModeOutcome::Interrupted)
}

fn log_outcome(id: &JobId, outcome: Result<JobResult>) {
    match outcome {
        Ok(_) => info!(job_id = %id, "job succeeded"),
        Err(err) => error!(job_id = %id, error = %err, "job failed"),
    }
}
