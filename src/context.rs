// src/context.rs

//! Process-wide context.
//!
//! Built once at startup and handed to every component constructor. Nothing
//! in the crate reaches for global state; tests build their own context over
//! a temp dir or a `MockFileSystem`.

use std::fmt;
use std::sync::Arc;

use crate::backend::{SpoolQueue, Worker};
use crate::config::RunConfiguration;
use crate::dispatch::{self, JobDispatcher};
use crate::errors::{ForrestError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::lock::LockManager;
use crate::pipeline::{CommandPipeline, JobRunner, Pipeline};

/// Where `--input -` reads from.
#[derive(Debug, Clone, Default)]
pub enum StdinSource {
    /// The process's real stdin.
    #[default]
    Process,
    /// Fixed text, used by tests and embedders.
    Fixed(String),
}

#[derive(Clone)]
pub struct AppContext {
    config: Arc<RunConfiguration>,
    fs: Arc<dyn FileSystem>,
    pipeline: Option<Arc<dyn Pipeline>>,
    stdin: StdinSource,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("fs", &self.fs)
            .field("custom_pipeline", &self.pipeline.is_some())
            .field("stdin", &self.stdin)
            .finish()
    }
}

impl AppContext {
    /// Context over the real file system.
    pub fn new(config: RunConfiguration) -> Self {
        Self::with_fs(config, Arc::new(RealFileSystem))
    }

    pub fn with_fs(config: RunConfiguration, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config: Arc::new(config),
            fs,
            pipeline: None,
            stdin: StdinSource::Process,
        }
    }

    /// Replace the configured shell command with an in-process pipeline.
    pub fn with_pipeline(mut self, pipeline: Arc<dyn Pipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Serve `--input -` from fixed text instead of the process stdin.
    pub fn with_stdin(mut self, text: impl Into<String>) -> Self {
        self.stdin = StdinSource::Fixed(text.into());
        self
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<RunConfiguration> {
        Arc::clone(&self.config)
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    pub fn stdin(&self) -> &StdinSource {
        &self.stdin
    }

    pub fn locks(&self) -> LockManager {
        LockManager::new(self.fs(), self.config.lock_dir())
    }

    pub fn queue(&self) -> SpoolQueue {
        SpoolQueue::new(self.fs(), self.config.queue_dir())
    }

    /// The injected pipeline, or a `CommandPipeline` for `pipeline_cmd`.
    pub fn pipeline(&self) -> Result<Arc<dyn Pipeline>> {
        if let Some(p) = &self.pipeline {
            return Ok(Arc::clone(p));
        }
        match self.config.pipeline_cmd() {
            Some(cmd) => Ok(Arc::new(CommandPipeline::new(cmd))),
            None => Err(ForrestError::config(
                "no pipeline command configured (set pipeline_cmd or --pipeline-cmd)",
            )),
        }
    }

    pub fn job_runner(&self) -> Result<JobRunner> {
        Ok(JobRunner::new(self.pipeline()?, self.locks()))
    }

    pub fn worker(&self) -> Result<Worker> {
        Ok(Worker::new(
            self.queue(),
            self.job_runner()?,
            self.config.poll_interval(),
        ))
    }

    pub fn dispatcher(&self) -> Result<Arc<dyn JobDispatcher>> {
        dispatch::dispatcher_for(self)
    }
}
