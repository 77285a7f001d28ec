// src/watch/event.rs

use std::path::PathBuf;

use notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind};

use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

/// One path touched by a filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub is_directory: bool,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, is_directory: bool, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            is_directory,
            kind,
        }
    }

    pub fn file(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self::new(path, false, kind)
    }

    pub fn directory(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self::new(path, true, kind)
    }

    /// Split a notify event into one `ChangeEvent` per path.
    ///
    /// Access and `Other` notifications are not changes and yield nothing.
    /// Renames carry both the old and the new path; each becomes a `Moved`
    /// event.
    pub fn from_notify(event: &notify::Event, fs: &dyn FileSystem) -> Vec<ChangeEvent> {
        let (kind, dir_hint) = match &event.kind {
            EventKind::Create(CreateKind::Folder) => (ChangeKind::Created, Some(true)),
            EventKind::Create(CreateKind::File) => (ChangeKind::Created, Some(false)),
            EventKind::Create(_) => (ChangeKind::Created, None),
            EventKind::Modify(ModifyKind::Name(_)) => (ChangeKind::Moved, None),
            EventKind::Modify(_) | EventKind::Any => (ChangeKind::Modified, None),
            EventKind::Remove(RemoveKind::Folder) => (ChangeKind::Deleted, Some(true)),
            EventKind::Remove(RemoveKind::File) => (ChangeKind::Deleted, Some(false)),
            EventKind::Remove(_) => (ChangeKind::Deleted, None),
            EventKind::Access(_) | EventKind::Other => return Vec::new(),
        };

        event
            .paths
            .iter()
            .map(|path| ChangeEvent {
                is_directory: dir_hint.unwrap_or_else(|| fs.is_dir(path)),
                path: path.clone(),
                kind,
            })
            .collect()
    }
}
