#![allow(dead_code)]

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, DataChange, EventKind, ModifyKind};

pub use forrest_test_utils::builders::RunConfigurationBuilder;
pub use forrest_test_utils::dispatcher::RecordingDispatcher;
pub use forrest_test_utils::pipelines::RecordingPipeline;
pub use forrest_test_utils::{eventually, init_tracing, with_timeout};

use forrest::watch::RawEvent;

/// Create `dir/watch` and return it.
pub fn watch_root(dir: &Path) -> PathBuf {
    let root = dir.join("watch");
    std::fs::create_dir_all(&root).unwrap();
    root
}

pub fn modified(path: impl Into<PathBuf>) -> RawEvent {
    Ok(notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
        .add_path(path.into()))
}

pub fn dir_created(path: impl Into<PathBuf>) -> RawEvent {
    Ok(notify::Event::new(EventKind::Create(CreateKind::Folder)).add_path(path.into()))
}

pub fn file_created(path: impl Into<PathBuf>) -> RawEvent {
    Ok(notify::Event::new(EventKind::Create(CreateKind::File)).add_path(path.into()))
}
