// src/watch/watcher.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{Config, Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RunConfiguration;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::WatcherKind;
use crate::watch::event::ChangeEvent;
use crate::watch::filter::ChangeFilter;
use crate::watch::path_utils::display_path;

/// What the notify callback forwards into the async side.
pub type RawEvent = notify::Result<Event>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Created,
    Running,
    Stopped,
}

/// Keeps the notify watcher alive. Dropping it tears down the subscription.
#[allow(dead_code)]
enum Subscription {
    Native(RecommendedWatcher),
    Poll(PollWatcher),
}

/// Recursive watch over the configured root.
///
/// `start` moves the loop to `Running` and returns the [`WatchHandle`] that
/// owns it from then on.
pub struct WatchLoop {
    config: Arc<RunConfiguration>,
    filter: ChangeFilter,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for WatchLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("root", &self.config.watch_path())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl WatchLoop {
    pub fn new(
        config: Arc<RunConfiguration>,
        filter: ChangeFilter,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self { config, filter, fs }
    }

    pub fn state(&self) -> WatchState {
        WatchState::Created
    }

    /// Subscribe under the watch root and call `on_change` once per
    /// qualifying event.
    pub fn start<F>(self, on_change: F) -> Result<WatchHandle>
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let root = self.config.watch_path().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<RawEvent>();

        // Called synchronously on notify's own thread.
        let handler = move |res: RawEvent| {
            // The receiver is gone once the loop has been cancelled.
            let _ = event_tx.send(res);
        };

        let subscription = match self.config.watcher() {
            WatcherKind::Native => {
                let mut watcher = RecommendedWatcher::new(handler, Config::default())?;
                watcher.watch(&root, RecursiveMode::Recursive)?;
                Subscription::Native(watcher)
            }
            WatcherKind::Poll => {
                let config = Config::default().with_poll_interval(self.config.poll_interval());
                let mut watcher = PollWatcher::new(handler, config)?;
                watcher.watch(&root, RecursiveMode::Recursive)?;
                Subscription::Poll(watcher)
            }
        };

        info!(root = ?root, watcher = %self.config.watcher(), "file watcher started");
        Ok(self.spawn(event_rx, Some(subscription), on_change))
    }

    /// Run the loop over an externally supplied event stream instead of a
    /// notify subscription.
    pub fn start_with_source<F>(
        self,
        events: mpsc::UnboundedReceiver<RawEvent>,
        on_change: F,
    ) -> WatchHandle
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        debug!(root = ?self.config.watch_path(), "watch loop started on injected event source");
        self.spawn(events, None, on_change)
    }

    fn spawn<F>(
        self,
        mut events: mpsc::UnboundedReceiver<RawEvent>,
        subscription: Option<Subscription>,
        mut on_change: F,
    ) -> WatchHandle
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let root: PathBuf = self.config.watch_path().to_path_buf();
        let filter = self.filter;
        let fs = self.fs;

        let mut log_roots = vec![root.clone()];
        if let Ok(canonical) = fs.canonicalize(&root)
            && canonical != root
        {
            log_roots.push(canonical);
        }

        let task = tokio::spawn(async move {
            loop {
                let res = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    res = events.recv() => match res {
                        Some(res) => res,
                        None => break,
                    },
                };

                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(error = %err, "file watch error; continuing");
                        continue;
                    }
                };

                for change in ChangeEvent::from_notify(&event, fs.as_ref()) {
                    // Field expressions only run when debug logging is on.
                    if filter.qualifies(&change) {
                        debug!(path = %display_path(&log_roots, &change.path), kind = ?change.kind, "qualifying change");
                        on_change(change);
                    } else {
                        debug!(path = %display_path(&log_roots, &change.path), kind = ?change.kind, "change filtered out");
                    }
                }
            }
            debug!("watch loop finished");
        });

        WatchHandle {
            subscription,
            cancel,
            task: Some(task),
            state: WatchState::Running,
        }
    }
}

/// Running watch loop.
pub struct WatchHandle {
    subscription: Option<Subscription>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    state: WatchState,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl WatchHandle {
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Tear down the subscription and wait for the loop task to exit.
    ///
    /// Calling it again is a no-op. No events are delivered after it returns.
    pub async fn cancel(&mut self) {
        if self.state == WatchState::Stopped {
            return;
        }

        drop(self.subscription.take());
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "watch loop task ended abnormally");
            }
        }

        self.state = WatchState::Stopped;
        info!("file watcher stopped");
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
