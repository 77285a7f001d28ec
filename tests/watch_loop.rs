mod common;
use crate::common::{
    RunConfigurationBuilder, dir_created, eventually, init_tracing, modified, watch_root,
    with_timeout,
};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use forrest::fs::RealFileSystem;
use forrest::types::WatcherKind;
use forrest::watch::path_utils::{display_path, relative_str};
use forrest::watch::{ChangeEvent, ChangeFilter, ChangeKind, RawEvent, WatchLoop, WatchState};

fn recorder() -> (Arc<Mutex<Vec<ChangeEvent>>>, impl FnMut(ChangeEvent) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |e| sink.lock().unwrap().push(e))
}

#[tokio::test]
async fn injected_events_are_filtered_in_order() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = watch_root(tmp.path());
    let config = Arc::new(
        RunConfigurationBuilder::in_dir(tmp.path())
            .patterns(&["*.yml"])
            .ignore_directories(true)
            .build(),
    );
    let filter = ChangeFilter::from_config(&config).unwrap();
    let watch_loop = WatchLoop::new(config, filter, Arc::new(RealFileSystem));
    assert_eq!(watch_loop.state(), WatchState::Created);

    let (tx, rx) = mpsc::unbounded_channel::<RawEvent>();
    let (seen, on_change) = recorder();
    let mut handle = watch_loop.start_with_source(rx, on_change);
    assert_eq!(handle.state(), WatchState::Running);

    tx.send(modified(root.join("a.yml"))).unwrap();
    tx.send(dir_created(root.join("sub.yml"))).unwrap();
    tx.send(Err(notify::Error::generic("transient failure"))).unwrap();
    tx.send(modified(root.join("config.json"))).unwrap();
    tx.send(modified(root.join("b.yml"))).unwrap();

    assert!(eventually(Duration::from_secs(2), || seen.lock().unwrap().len() >= 2).await);
    handle.cancel().await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ChangeEvent::file(root.join("a.yml"), ChangeKind::Modified),
            ChangeEvent::file(root.join("b.yml"), ChangeKind::Modified),
        ]
    );
}

#[tokio::test]
async fn cancel_is_idempotent_and_final() {
    let tmp = tempfile::tempdir().unwrap();
    let root = watch_root(tmp.path());
    let config = Arc::new(RunConfigurationBuilder::in_dir(tmp.path()).build());
    let filter = ChangeFilter::from_config(&config).unwrap();

    let (tx, rx) = mpsc::unbounded_channel::<RawEvent>();
    let (seen, on_change) = recorder();
    let mut handle =
        WatchLoop::new(config, filter, Arc::new(RealFileSystem)).start_with_source(rx, on_change);

    with_timeout(handle.cancel()).await;
    assert_eq!(handle.state(), WatchState::Stopped);
    with_timeout(handle.cancel()).await;
    assert_eq!(handle.state(), WatchState::Stopped);

    // Nothing is delivered once stopped.
    let _ = tx.send(modified(root.join("late.yml")));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(seen.lock().unwrap().is_empty());
}

async fn real_watcher_reports_file_writes(kind: WatcherKind) {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = watch_root(tmp.path());
    let config = Arc::new(
        RunConfigurationBuilder::in_dir(tmp.path())
            .patterns(&["*.yml"])
            .ignore_directories(true)
            .watcher(kind)
            .poll_interval_ms(50)
            .build(),
    );
    let filter = ChangeFilter::from_config(&config).unwrap();
    let (seen, on_change) = recorder();
    let mut handle = WatchLoop::new(config, filter, Arc::new(RealFileSystem))
        .start(on_change)
        .unwrap();

    // Give the poll watcher its initial scan.
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::create_dir(root.join("nested")).unwrap();
    std::fs::write(root.join("nested").join("config.json"), "{}").unwrap();
    std::fs::write(root.join("nested").join("suite.yml"), "steps: []").unwrap();

    let arrived = eventually(Duration::from_secs(5), || {
        seen.lock()
            .unwrap()
            .iter()
            .any(|e| e.path.ends_with("suite.yml"))
    })
    .await;
    handle.cancel().await;

    assert!(arrived, "no event for suite.yml");
    let seen = seen.lock().unwrap();
    assert!(seen.iter().all(|e| !e.is_directory));
    assert!(seen.iter().all(|e| e.path.extension().is_some_and(|x| x == "yml")));
}

#[tokio::test]
async fn native_watcher_reports_file_writes() {
    real_watcher_reports_file_writes(WatcherKind::Native).await;
}

#[tokio::test]
async fn poll_watcher_reports_file_writes() {
    real_watcher_reports_file_writes(WatcherKind::Poll).await;
}

#[test]
fn log_paths_are_shortened_without_touching_disk() {
    let roots = vec![
        PathBuf::from("/srv/forrest-missing/watch"),
        PathBuf::from("/private/srv/forrest-missing/watch"),
    ];

    assert_eq!(
        display_path(&roots, Path::new("/srv/forrest-missing/watch/suites/a.yml")),
        "suites/a.yml"
    );
    assert_eq!(
        display_path(&roots, Path::new("/private/srv/forrest-missing/watch/b.yml")),
        "b.yml"
    );
    assert_eq!(
        display_path(&roots, Path::new("/elsewhere/c.yml")),
        "/elsewhere/c.yml"
    );
    assert_eq!(
        relative_str(&roots[0], Path::new("/srv/forrest-missing/other/d.yml")),
        None
    );
}
