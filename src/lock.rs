// src/lock.rs

//! Advisory run lock.
//!
//! One lock file per target under the configured lock directory:
//!
//! `<lock_dir>/<blake3(target)[..16]>.lock`
//!
//! The file holds a small JSON [`LockRecord`]. Nothing stops a caller that
//! passes `force = true`: the previous file is deleted without checking
//! whether its holder is still alive. That override is the operator's call
//! and can produce overlapping runs if the old holder is in fact running.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{ForrestError, Result};
use crate::fs::FileSystem;

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub target: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Held,
    Absent,
}

/// Hands out [`RunLock`]s rooted in one lock directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl LockManager {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lock file path for `target`.
    pub fn lock_path(&self, target: &str) -> PathBuf {
        let digest = blake3::hash(target.as_bytes()).to_hex();
        self.dir.join(format!("{}.lock", &digest[..16]))
    }

    /// Lock target for a watch path.
    ///
    /// Every spelling of the same directory maps to one target: the canonical
    /// path when it resolves, otherwise the absolute path with `.`, `..` and
    /// trailing separators folded away.
    pub fn target_for_path(&self, path: &Path) -> String {
        let resolved = match self.fs.canonicalize(path) {
            Ok(canonical) => canonical,
            Err(e) => {
                debug!(path = ?path, error = %e, "canonicalize failed; normalizing lock target lexically");
                path.to_path_buf()
            }
        };
        normalize_lexically(&resolved).display().to_string()
    }

    /// An unheld lock for the watch path `path`, see [`Self::target_for_path`].
    pub fn lock_for_path(&self, path: &Path) -> RunLock {
        self.lock_for(self.target_for_path(path))
    }

    /// An unheld lock for `target`. Nothing touches the disk until `acquire`.
    pub fn lock_for(&self, target: impl Into<String>) -> RunLock {
        let target = target.into();
        RunLock {
            fs: Arc::clone(&self.fs),
            path: self.lock_path(&target),
            target,
            state: LockState::Absent,
            record: None,
        }
    }

    /// Convenience: `lock_for(target)` followed by `acquire(force)`.
    pub fn acquire(&self, target: impl Into<String>, force: bool) -> Result<RunLock> {
        let mut lock = self.lock_for(target);
        lock.acquire(force)?;
        Ok(lock)
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// A single advisory lock. Released on `release()` or on drop.
pub struct RunLock {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    target: String,
    state: LockState,
    /// Serialized record we wrote, used to recognise our own file on release.
    record: Option<String>,
}

impl fmt::Debug for RunLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLock")
            .field("target", &self.target)
            .field("path", &self.path)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl RunLock {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == LockState::Held
    }

    /// Take the lock.
    ///
    /// - No lock file: create it, state becomes `Held`.
    /// - Lock file present and `force == false`: `AlreadyLocked`.
    /// - Lock file present and `force == true`: delete it and take a fresh one.
    pub fn acquire(&mut self, force: bool) -> Result<()> {
        if self.is_held() {
            return Ok(());
        }

        let record = serde_json::to_string(&LockRecord {
            target: self.target.clone(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        })?;

        if self.fs.create_new(&self.path, record.as_bytes())? {
            return self.mark_held(record);
        }

        if !force {
            return Err(self.already_locked());
        }

        match self.read_record() {
            Some(prev) => warn!(
                lock_target = %self.target,
                previous_pid = prev.pid,
                previous_since = %prev.acquired_at,
                "--force given; discarding existing lock without checking its holder"
            ),
            None => warn!(
                lock_target = %self.target,
                path = ?self.path,
                "--force given; discarding unreadable lock file"
            ),
        }

        self.fs.remove_file(&self.path)?;
        if self.fs.create_new(&self.path, record.as_bytes())? {
            return self.mark_held(record);
        }

        // Somebody else grabbed it between our remove and create.
        Err(self.already_locked())
    }

    /// Give the lock back. Safe to call any number of times, including when
    /// the lock was never acquired.
    pub fn release(&mut self) -> Result<()> {
        if !self.is_held() {
            return Ok(());
        }
        self.state = LockState::Absent;

        let ours = self.record.take();
        let on_disk = self.fs.read_to_string(&self.path).ok();
        if on_disk.is_some() && on_disk != ours {
            debug!(
                lock_target = %self.target,
                "lock file was taken over by another run; leaving it in place"
            );
            return Ok(());
        }

        self.fs.remove_file(&self.path)?;
        info!(lock_target = %self.target, "run lock released");
        Ok(())
    }

    fn mark_held(&mut self, record: String) -> Result<()> {
        self.state = LockState::Held;
        self.record = Some(record);
        info!(lock_target = %self.target, path = ?self.path, "run lock acquired");
        Ok(())
    }

    fn read_record(&self) -> Option<LockRecord> {
        let text = self.fs.read_to_string(&self.path).ok()?;
        serde_json::from_str(&text).ok()
    }

    fn already_locked(&self) -> ForrestError {
        ForrestError::AlreadyLocked {
            target: self.target.clone(),
            path: self.path.clone(),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(lock_target = %self.target, error = %e, "failed to release run lock");
        }
    }
}
