// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every option here is optional on purpose: values that are not given on the
//! command line fall back to the `--config` TOML file and then to built-in
//! defaults (see [`crate::config::loader`]).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::mode::Mode;
use crate::types::{InputSource, WatcherKind};

/// Command-line arguments for `forrest`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "forrest",
    version,
    about = "Watch a directory and dispatch the pipeline on every qualifying change.",
    long_about = None
)]
pub struct CliArgs {
    /// Which behaviour to run. Without a mode the process does nothing.
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<ModeArg>,

    /// Optional TOML file providing defaults for every option below.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The root of the path to watch.
    #[arg(short = 'p', long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Patterns to watch in the path (repeat, or separate with ';').
    #[arg(long, value_name = "GLOB", value_delimiter = ';')]
    pub patterns: Vec<String>,

    /// Patterns to ignore in the path (repeat, or separate with ';').
    #[arg(
        long = "ignore-patterns",
        alias = "ignore_patterns",
        value_name = "GLOB",
        value_delimiter = ';'
    )]
    pub ignore_patterns: Vec<String>,

    /// Ignore events on directories.
    #[arg(long = "ignore-directories", alias = "ignore_directories")]
    pub ignore_directories: bool,

    /// Match patterns case sensitively.
    #[arg(long = "case-sensitive", alias = "case_sensitive")]
    pub case_sensitive: bool,

    /// If a lockfile is already present, ignore it and run anyway.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// The location of the input file (use '-' for stdin).
    #[arg(short = 'i', long, value_name = "PATH")]
    pub input: Option<InputSource>,

    /// Run jobs in-process instead of on the queue. Errors surface locally.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// The URL the pipeline reports to.
    #[arg(long = "report-url", value_name = "URL")]
    pub report_url: Option<String>,

    /// Where the pipeline injects features.
    #[arg(long = "features-path", alias = "veripy-features", value_name = "PATH")]
    pub features_path: Option<PathBuf>,

    /// A YAML configuration file for logging.
    #[arg(long = "logging-config", alias = "logging_config", value_name = "PATH")]
    pub logging_config: Option<PathBuf>,

    /// Don't record video for the run.
    #[arg(long = "no-video")]
    pub no_video: bool,

    /// Print extra output.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Shell command that implements the pipeline job.
    #[arg(long = "pipeline-cmd", value_name = "CMD")]
    pub pipeline_cmd: Option<String>,

    /// Spool directory shared by submitters and workers.
    #[arg(long = "queue-dir", value_name = "DIR")]
    pub queue_dir: Option<PathBuf>,

    /// Directory holding run lock files.
    #[arg(long = "lock-dir", value_name = "DIR")]
    pub lock_dir: Option<PathBuf>,

    /// Filesystem notification backend.
    #[arg(long, value_name = "KIND")]
    pub watcher: Option<WatcherKind>,

    /// Poll interval for the poll watcher and the job queue.
    #[arg(long = "poll-interval-ms", value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Give up waiting on a queued job after this many seconds.
    #[arg(long = "job-timeout-secs", value_name = "SECS")]
    pub job_timeout_secs: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FORREST_LOG`, the logging config or a default is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Run mode as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Watch,
    Worker,
    Idle,
    Once,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Watch => Mode::Watch,
            ModeArg::Worker => Mode::Worker,
            ModeArg::Idle => Mode::Idle,
            ModeArg::Once => Mode::RunOnce,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// The explicit mode selector, if any.
    pub fn selected_mode(&self) -> Option<Mode> {
        self.mode.map(Mode::from)
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
