// src/mode/controller.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::dispatch::JobDispatcher;
use crate::errors::Result;
use crate::mode::watch::run_watch;
use crate::mode::{Mode, ModeOutcome};
use crate::watch::RawEvent;

/// Drives the selected mode to completion.
///
/// The dispatcher is built from the context on first need unless one was
/// injected; idle and worker modes never build one.
pub struct ModeController {
    ctx: AppContext,
    dispatcher: Option<Arc<dyn JobDispatcher>>,
    event_source: Option<mpsc::UnboundedReceiver<RawEvent>>,
}

impl std::fmt::Debug for ModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeController")
            .field("ctx", &self.ctx)
            .field("custom_dispatcher", &self.dispatcher.is_some())
            .field("custom_event_source", &self.event_source.is_some())
            .finish()
    }
}

impl ModeController {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            dispatcher: None,
            event_source: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn JobDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Feed watch mode from `events` instead of a notify subscription.
    pub fn with_event_source(mut self, events: mpsc::UnboundedReceiver<RawEvent>) -> Self {
        self.event_source = Some(events);
        self
    }

    pub async fn run(
        mut self,
        selection: Option<Mode>,
        shutdown: CancellationToken,
    ) -> Result<ModeOutcome> {
        let Some(mode) = selection else {
            info!("no run mode selected; nothing to do");
            return Ok(ModeOutcome::NoOp);
        };

        info!(%mode, "entering run mode");
        match mode {
            Mode::Worker => {
                let worker = self.ctx.worker()?;
                worker.run(shutdown).await?;
                Ok(ModeOutcome::Interrupted)
            }
            Mode::Watch => {
                let dispatcher = self.dispatcher()?;
                let events = self.event_source.take();
                run_watch(&self.ctx, dispatcher, events, shutdown).await
            }
            Mode::Idle => {
                info!("idle; waiting for interrupt");
                shutdown.cancelled().await;
                Ok(ModeOutcome::Interrupted)
            }
            Mode::RunOnce => self.run_once(shutdown).await,
        }
    }

    async fn run_once(&self, shutdown: CancellationToken) -> Result<ModeOutcome> {
        let dispatcher = self.dispatcher()?;
        let input = self.ctx.config().input_source();

        let job = async {
            let handle = dispatcher.submit(input).await?;
            info!(job_id = %handle.id(), "waiting for job");
            handle.wait().await
        };

        tokio::select! {
            result = job => {
                let result = result?;
                info!(job_id = %result.id, "job succeeded");
                Ok(ModeOutcome::Completed(result))
            }
            _ = shutdown.cancelled() => {
                warn!("interrupt received before the job finished");
                Ok(ModeOutcome::Cancelled)
            }
        }
    }

    fn dispatcher(&self) -> Result<Arc<dyn JobDispatcher>> {
        match &self.dispatcher {
            Some(d) => Ok(Arc::clone(d)),
            None => self.ctx.dispatcher(),
        }
    }
}
