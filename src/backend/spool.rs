// src/backend/spool.rs

//! Directory-backed job queue.
//!
//! Layout under the queue root:
//!
//! ```text
//! pending/<id>.json   enqueued payloads, claimed in id order
//! running/<id>.json   payloads a worker has claimed
//! done/<id>.json      JobResult written by the worker
//! ```
//!
//! Every state change is a rename, so submitters and workers in different
//! processes (or containers sharing a volume) never see half-written files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::job::{JobId, JobPayload, JobResult};
use crate::errors::{ForrestError, Result};
use crate::fs::FileSystem;

const PENDING: &str = "pending";
const RUNNING: &str = "running";
const DONE: &str = "done";
const EXT: &str = "json";

#[derive(Clone)]
pub struct SpoolQueue {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl fmt::Debug for SpoolQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpoolQueue")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl SpoolQueue {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the queue directories if needed.
    pub fn init(&self) -> Result<()> {
        for dir in [PENDING, RUNNING, DONE] {
            self.fs.create_dir_all(&self.root.join(dir))?;
        }
        Ok(())
    }

    fn slot(&self, dir: &str, id: &JobId) -> PathBuf {
        self.root.join(dir).join(format!("{id}.{EXT}"))
    }

    /// Publish a payload for any worker to pick up.
    pub fn enqueue(&self, payload: &JobPayload) -> Result<()> {
        self.init()?;
        let body = serde_json::to_vec_pretty(payload)?;
        let dest = self.slot(PENDING, &payload.id);
        self.publish(&dest, &body)?;
        info!(job_id = %payload.id, queue = ?self.root, "job enqueued");
        Ok(())
    }

    /// Claim the oldest pending job, if any.
    ///
    /// Losing a rename race to another worker just moves on to the next
    /// candidate. A payload that cannot be parsed is completed as failed so
    /// whoever submitted it stops waiting.
    pub fn claim_next(&self) -> Result<Option<JobPayload>> {
        for (id, pending) in self.list(PENDING)? {
            let running = self.slot(RUNNING, &id);
            if !self.fs.rename(&pending, &running)? {
                debug!(job_id = %id, "job claimed by another worker");
                continue;
            }

            let parsed = self
                .fs
                .read_to_string(&running)
                .map_err(ForrestError::from)
                .and_then(|text| Ok(serde_json::from_str::<JobPayload>(&text)?));

            match parsed {
                Ok(payload) if payload.id == id => {
                    debug!(job_id = %id, "job claimed");
                    return Ok(Some(payload));
                }
                Ok(payload) => {
                    warn!(job_id = %id, payload_id = %payload.id, "payload id does not match its file name");
                    self.reject(JobResult::failed(id, "payload id does not match its file name"));
                }
                Err(err) => {
                    warn!(job_id = %id, error = %err, "unreadable job payload");
                    self.reject(JobResult::failed(id, format!("unreadable job payload: {err}")));
                }
            }
        }
        Ok(None)
    }

    /// Complete a payload `claim_next` could not use. A failure here is
    /// logged and the claim pass carries on with the next candidate.
    fn reject(&self, result: JobResult) {
        if let Err(err) = self.complete(&result) {
            warn!(job_id = %result.id, error = %err, "failed to record result for rejected payload");
        }
    }

    /// Record a terminal result and drop the running entry.
    pub fn complete(&self, result: &JobResult) -> Result<()> {
        self.init()?;
        let body = serde_json::to_vec_pretty(result)?;
        self.publish(&self.slot(DONE, &result.id), &body)?;
        self.fs.remove_file(&self.slot(RUNNING, &result.id))?;
        info!(job_id = %result.id, status = ?result.status, "job completed");
        Ok(())
    }

    /// Result for `id` if the job has finished.
    pub fn poll_result(&self, id: &JobId) -> Result<Option<JobResult>> {
        let path = self.slot(DONE, id);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let text = self.fs.read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Remove a result once its submitter has read it.
    pub fn acknowledge(&self, id: &JobId) -> Result<()> {
        self.fs.remove_file(&self.slot(DONE, id))?;
        Ok(())
    }

    pub fn pending(&self) -> Result<Vec<JobId>> {
        Ok(self.list(PENDING)?.into_iter().map(|(id, _)| id).collect())
    }

    pub fn running(&self) -> Result<Vec<JobId>> {
        Ok(self.list(RUNNING)?.into_iter().map(|(id, _)| id).collect())
    }

    /// `<id>.json` entries of one state directory, oldest first.
    fn list(&self, dir: &str) -> Result<Vec<(JobId, PathBuf)>> {
        let dir = self.root.join(dir);
        if !self.fs.is_dir(&dir) {
            return Ok(Vec::new());
        }

        let mut entries: Vec<(JobId, PathBuf)> = self
            .fs
            .read_dir(&dir)?
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(EXT))
            .filter_map(|p| {
                let id = JobId::parse(p.file_stem()?.to_str()?)?;
                Some((id, p))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    /// Write to a temp name next to `dest`, then rename into place.
    fn publish(&self, dest: &Path, body: &[u8]) -> Result<()> {
        let tmp = dest.with_extension(format!("{EXT}.tmp"));
        self.fs.write(&tmp, body)?;
        if !self.fs.rename(&tmp, dest)? {
            return Err(ForrestError::Backend(format!(
                "temporary file {:?} disappeared before publish",
                tmp
            )));
        }
        Ok(())
    }
}
