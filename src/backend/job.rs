// src/backend/job.rs

//! Job payload and result types exchanged through the backend.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RunConfiguration;
use crate::errors::{ForrestError, Result};

/// Identifier of a submitted job.
///
/// Formatted as `<UTC timestamp>-<sequence>-<uuid>`. The sequence is a
/// process-wide counter printed at fixed width, so ids generated by one
/// process sort in generation order even within the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

impl JobId {
    pub fn generate() -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        JobId(format!(
            "{}-{:016x}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            seq,
            Uuid::new_v4().simple()
        ))
    }

    /// Accept an id read back from disk. Only characters `generate` can
    /// produce are allowed, so an id is always a safe file stem.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty()
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| JobId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input handed to the pipeline, already resolved on the submitting side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum JobInput {
    None,
    Path(PathBuf),
    /// Contents read from the submitter's stdin.
    Inline(String),
}

/// Everything a worker needs to run one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub id: JobId,
    pub submitted_at: DateTime<Utc>,
    /// Flattened [`RunConfiguration`] of the submitter.
    pub config: BTreeMap<String, String>,
    pub input: JobInput,
}

impl JobPayload {
    pub fn new(config: &RunConfiguration, input: JobInput) -> Self {
        Self {
            id: JobId::generate(),
            submitted_at: Utc::now(),
            config: config.to_payload(),
            input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

/// Terminal report for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    pub fn succeeded(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Succeeded,
            message: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(id: JobId, message: impl Into<String>) -> Self {
        Self {
            id,
            status: JobStatus::Failed,
            message: Some(message.into()),
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Turn a failed report into `ForrestError::JobFailed`.
    pub fn into_result(self) -> Result<JobResult> {
        match self.status {
            JobStatus::Succeeded => Ok(self),
            JobStatus::Failed => Err(ForrestError::JobFailed {
                message: self
                    .message
                    .unwrap_or_else(|| "no failure message recorded".to_string()),
                id: self.id,
            }),
        }
    }
}
