// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::JobId;

#[derive(Error, Debug)]
pub enum ForrestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("run already in progress for {target} (lock file {path:?}); re-run with --force to override")]
    AlreadyLocked { target: String, path: PathBuf },

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("job {id} failed: {message}")]
    JobFailed { id: JobId, message: String },

    #[error("job {id} did not finish within the configured timeout")]
    JobTimedOut { id: JobId },

    #[error("pipeline exited with status {code}")]
    PipelineFailed { code: i32 },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ForrestError {
    /// Shorthand used by validation code.
    pub fn config(msg: impl Into<String>) -> Self {
        ForrestError::Config(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ForrestError>;
