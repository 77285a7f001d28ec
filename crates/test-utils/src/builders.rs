#![allow(dead_code)]

use std::path::{Path, PathBuf};

use forrest::config::{RawRunConfiguration, RunConfiguration};
use forrest::errors::Result;
use forrest::types::{InputSource, WatcherKind};

/// Builder for `RunConfiguration` to simplify test setup.
///
/// Everything goes through `RunConfiguration::try_from`, so tests see the
/// same validation as the binary.
pub struct RunConfigurationBuilder {
    raw: RawRunConfiguration,
}

impl RunConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawRunConfiguration::default(),
        }
    }

    /// Keep every path the run touches under `dir`:
    /// `dir/watch`, `dir/queue`, `dir/locks`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new()
            .path(dir.join("watch"))
            .queue_dir(dir.join("queue"))
            .lock_dir(dir.join("locks"))
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.path = Some(path.into());
        self
    }

    pub fn patterns(mut self, patterns: &[&str]) -> Self {
        self.raw.patterns = Some(patterns.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn ignore_patterns(mut self, patterns: &[&str]) -> Self {
        self.raw.ignore_patterns = Some(patterns.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn ignore_directories(mut self, val: bool) -> Self {
        self.raw.ignore_directories = val;
        self
    }

    pub fn case_sensitive(mut self, val: bool) -> Self {
        self.raw.case_sensitive = val;
        self
    }

    pub fn force(mut self, val: bool) -> Self {
        self.raw.force = val;
        self
    }

    pub fn debug(mut self, val: bool) -> Self {
        self.raw.debug = val;
        self
    }

    pub fn input(mut self, input: InputSource) -> Self {
        self.raw.input = Some(input);
        self
    }

    pub fn report_url(mut self, url: &str) -> Self {
        self.raw.report_url = Some(url.to_string());
        self
    }

    pub fn pipeline_cmd(mut self, cmd: &str) -> Self {
        self.raw.pipeline_cmd = Some(cmd.to_string());
        self
    }

    pub fn queue_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.queue_dir = Some(dir.into());
        self
    }

    pub fn lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.lock_dir = Some(dir.into());
        self
    }

    pub fn watcher(mut self, kind: WatcherKind) -> Self {
        self.raw.watcher = kind;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.raw.poll_interval_ms = Some(ms);
        self
    }

    pub fn job_timeout_secs(mut self, secs: u64) -> Self {
        self.raw.job_timeout_secs = Some(secs);
        self
    }

    pub fn raw(self) -> RawRunConfiguration {
        self.raw
    }

    pub fn try_build(self) -> Result<RunConfiguration> {
        RunConfiguration::try_from(self.raw)
    }

    pub fn build(self) -> RunConfiguration {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for RunConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
