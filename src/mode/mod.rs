// src/mode/mod.rs

//! Run-mode selection.
//!
//! The process does exactly one of four things, chosen at startup by the
//! caller (CLI `--mode`, deployment topology). No selection is a valid no-op.

pub mod controller;
pub mod shutdown;
pub mod watch;

use std::fmt;

use crate::backend::JobResult;
use crate::errors::Result;

pub use controller::ModeController;
pub use shutdown::install_shutdown_handler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Consume jobs from the spool until interrupted.
    Worker,
    /// Watch the root and dispatch a job per qualifying change.
    Watch,
    /// Stay alive until interrupted; do nothing else.
    Idle,
    /// Dispatch one job and exit with its status.
    RunOnce,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Worker => "worker",
            Mode::Watch => "watch",
            Mode::Idle => "idle",
            Mode::RunOnce => "run-once",
        };
        f.write_str(s)
    }
}

/// How a mode ended when it ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeOutcome {
    /// Run-once finished and the job succeeded.
    Completed(JobResult),
    /// A long-running mode stopped on interrupt.
    Interrupted,
    /// Run-once was interrupted before its job reached a terminal state.
    Cancelled,
    /// No mode was selected.
    NoOp,
}

/// Exit status for a run-once job cut short by SIGINT/SIGTERM (128 + SIGINT).
pub const CANCELLED_EXIT_CODE: i32 = 130;

impl ModeOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            ModeOutcome::Completed(_) | ModeOutcome::Interrupted | ModeOutcome::NoOp => 0,
            ModeOutcome::Cancelled => CANCELLED_EXIT_CODE,
        }
    }
}

/// Process exit status for a finished mode. Any error is non-zero.
pub fn exit_code(result: &Result<ModeOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => 1,
    }
}
