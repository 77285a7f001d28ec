mod common;
use crate::common::{RecordingPipeline, RunConfigurationBuilder, init_tracing, with_timeout};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use forrest::backend::{JobId, JobInput, JobPayload, JobResult, JobStatus, SpoolQueue, Worker};
use forrest::context::AppContext;
use forrest::dispatch::{JobDispatcher, QueueDispatcher};
use forrest::errors::ForrestError;
use forrest::fs::mock::MockFileSystem;
use forrest::fs::{FileSystem, RealFileSystem};
use forrest::lock::LockManager;
use forrest::pipeline::{JobRunner, Pipeline};
use forrest::types::InputSource;

fn payload(input: JobInput) -> JobPayload {
    JobPayload::new(&RunConfigurationBuilder::new().build(), input)
}

fn runner(pipeline: Arc<dyn Pipeline>, fs: Arc<dyn FileSystem>, dir: &Path) -> JobRunner {
    JobRunner::new(pipeline, LockManager::new(fs, dir.join("locks")))
}

#[test]
fn job_ids_sort_by_submission_time() {
    let ids: Vec<JobId> = (0..2000).map(|_| JobId::generate()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(sorted, ids);

    let a = &ids[0];
    assert_eq!(JobId::parse(a.as_str()), Some(a.clone()));
    assert_eq!(JobId::parse("../escape"), None);
}

#[test]
fn burst_of_jobs_is_claimed_in_submission_order() {
    let fs = MockFileSystem::new();
    let queue = SpoolQueue::new(Arc::new(fs.clone()), "/spool");

    let jobs: Vec<JobPayload> = (0..50)
        .map(|i| payload(JobInput::Inline(format!("change {i}"))))
        .collect();
    for job in jobs.iter().rev() {
        queue.enqueue(job).unwrap();
    }

    for expected in &jobs {
        assert_eq!(queue.claim_next().unwrap().as_ref(), Some(expected));
    }
    assert_eq!(queue.claim_next().unwrap(), None);
}

#[test]
fn spool_claims_oldest_first_and_reports_results() {
    init_tracing();
    let fs = MockFileSystem::new();
    let queue = SpoolQueue::new(Arc::new(fs.clone()), "/spool");

    let first = payload(JobInput::None);
    let second = payload(JobInput::Inline("hello".to_string()));
    queue.enqueue(&second).unwrap();
    queue.enqueue(&first).unwrap();
    assert_eq!(queue.pending().unwrap(), vec![first.id.clone(), second.id.clone()]);

    let claimed = queue.claim_next().unwrap().unwrap();
    assert_eq!(claimed, first);
    assert_eq!(queue.running().unwrap(), vec![first.id.clone()]);
    assert_eq!(queue.poll_result(&first.id).unwrap(), None);

    queue.complete(&JobResult::succeeded(first.id.clone())).unwrap();
    assert!(queue.running().unwrap().is_empty());
    let result = queue.poll_result(&first.id).unwrap().unwrap();
    assert!(result.is_success());

    queue.acknowledge(&first.id).unwrap();
    assert_eq!(queue.poll_result(&first.id).unwrap(), None);

    assert_eq!(queue.claim_next().unwrap(), Some(second));
    assert_eq!(queue.claim_next().unwrap(), None);
}

#[test]
fn unreadable_payload_is_completed_as_failed() {
    let fs = MockFileSystem::new();
    let queue = SpoolQueue::new(Arc::new(fs.clone()), "/spool");
    queue.init().unwrap();

    let id = JobId::generate();
    fs.add_file(format!("/spool/pending/{id}.json"), "{ not json");

    assert_eq!(queue.claim_next().unwrap(), None);
    let result = queue.poll_result(&id).unwrap().unwrap();
    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.message.unwrap().contains("unreadable job payload"));
}

/// Delegates to a mock filesystem but refuses writes under one directory.
#[derive(Debug)]
struct ReadOnlyDir {
    inner: MockFileSystem,
    denied: PathBuf,
}

impl FileSystem for ReadOnlyDir {
    fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
        self.inner.read_to_string(path)
    }
    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        if path.starts_with(&self.denied) {
            anyhow::bail!("read-only: {}", path.display());
        }
        self.inner.write(path, contents)
    }
    fn create_new(&self, path: &Path, contents: &[u8]) -> anyhow::Result<bool> {
        self.inner.create_new(path, contents)
    }
    fn remove_file(&self, path: &Path) -> anyhow::Result<bool> {
        self.inner.remove_file(path)
    }
    fn rename(&self, from: &Path, to: &Path) -> anyhow::Result<bool> {
        self.inner.rename(from, to)
    }
    fn create_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.create_dir_all(path)
    }
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }
    fn canonicalize(&self, path: &Path) -> anyhow::Result<PathBuf> {
        self.inner.canonicalize(path)
    }
    fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }
}

#[test]
fn claim_skips_bad_payload_when_its_result_cannot_be_written() {
    init_tracing();
    let mock = MockFileSystem::new();
    let fs = ReadOnlyDir {
        inner: mock.clone(),
        denied: PathBuf::from("/spool/done"),
    };
    let queue = SpoolQueue::new(Arc::new(fs), "/spool");
    queue.init().unwrap();

    let bad = JobId::generate();
    let good = payload(JobInput::Inline("ok".to_string()));
    mock.add_file(format!("/spool/pending/{bad}.json"), "{ not json");
    queue.enqueue(&good).unwrap();

    assert_eq!(queue.claim_next().unwrap(), Some(good));
    assert_eq!(queue.poll_result(&bad).unwrap(), None);
}

#[test]
fn failed_result_becomes_job_failed_error() {
    let id = JobId::generate();
    let err = JobResult::failed(id.clone(), "boom").into_result().unwrap_err();
    match err {
        ForrestError::JobFailed { id: got, message } => {
            assert_eq!(got, id);
            assert_eq!(message, "boom");
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn runner_holds_lock_for_the_duration_of_the_job() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let pipeline = RecordingPipeline::succeeding().with_delay(Duration::from_millis(300));
    let runner = runner(Arc::new(pipeline.clone()), Arc::clone(&fs), tmp.path());

    let job = payload(JobInput::None);
    let running = {
        let runner = runner.clone();
        let job = job.clone();
        tokio::spawn(async move { runner.execute(&job).await })
    };

    // While the first run holds the lock, a second one is refused.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let err = runner.try_execute(&payload(JobInput::None)).await.unwrap_err();
    assert!(matches!(err, ForrestError::AlreadyLocked { .. }));

    let result = with_timeout(running).await.unwrap();
    assert!(result.is_success());
    assert_eq!(pipeline.call_count(), 1);

    // Released afterwards.
    assert!(runner.try_execute(&job).await.is_ok());
}

#[tokio::test]
async fn runner_releases_lock_after_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let runner = runner(Arc::new(RecordingPipeline::failing(3)), fs, tmp.path());

    let result = runner.execute(&payload(JobInput::None)).await;
    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.message.unwrap().contains("status 3"));

    let locks = std::fs::read_dir(tmp.path().join("locks")).unwrap().count();
    assert_eq!(locks, 0);
}

#[tokio::test]
async fn queued_job_is_run_by_worker_and_awaited_by_submitter() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = RunConfigurationBuilder::in_dir(tmp.path())
        .poll_interval_ms(20)
        .build();
    let pipeline = RecordingPipeline::succeeding();
    let ctx = AppContext::new(config).with_pipeline(Arc::new(pipeline.clone()));

    let dispatcher = QueueDispatcher::new(ctx.clone(), ctx.queue());
    let input = InputSource::Path(tmp.path().join("suite.yml"));
    let handle = dispatcher.submit(Some(&input)).await.unwrap();
    assert!(!handle.is_terminal());
    assert_eq!(ctx.queue().pending().unwrap(), vec![handle.id().clone()]);

    let shutdown = CancellationToken::new();
    let worker = ctx.worker().unwrap();
    let worker_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let id = handle.id().clone();
    let result = with_timeout(handle.wait()).await.unwrap();
    assert_eq!(result.id, id);
    assert!(result.is_success());

    let calls = pipeline.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].input, JobInput::Path(tmp.path().join("suite.yml")));
    assert_eq!(ctx.queue().poll_result(&id).unwrap(), None);

    shutdown.cancel();
    with_timeout(worker_task).await.unwrap().unwrap();
}

#[tokio::test]
async fn queued_job_failure_surfaces_from_wait() {
    let tmp = tempfile::tempdir().unwrap();
    let config = RunConfigurationBuilder::in_dir(tmp.path())
        .poll_interval_ms(20)
        .build();
    let ctx = AppContext::new(config).with_pipeline(Arc::new(RecordingPipeline::failing(2)));

    let dispatcher = QueueDispatcher::new(ctx.clone(), ctx.queue());
    let handle = dispatcher.submit(None).await.unwrap();

    let worker = ctx.worker().unwrap();
    assert!(worker.run_one().await.unwrap().is_some());

    let err = with_timeout(handle.wait()).await.unwrap_err();
    assert!(matches!(err, ForrestError::JobFailed { .. }));
}

#[tokio::test]
async fn wait_times_out_without_a_worker() {
    let tmp = tempfile::tempdir().unwrap();
    let config = RunConfigurationBuilder::in_dir(tmp.path())
        .poll_interval_ms(20)
        .job_timeout_secs(1)
        .build();
    let ctx = AppContext::new(config);

    let dispatcher = QueueDispatcher::new(ctx.clone(), ctx.queue());
    let handle = dispatcher.submit(None).await.unwrap();
    let err = with_timeout(handle.wait()).await.unwrap_err();
    assert!(matches!(err, ForrestError::JobTimedOut { .. }));
}

#[tokio::test]
async fn worker_with_empty_queue_stops_on_cancel() {
    let tmp = tempfile::tempdir().unwrap();
    let queue = SpoolQueue::new(Arc::new(RealFileSystem), tmp.path().join("queue"));
    let worker = Worker::new(
        queue.clone(),
        runner(
            Arc::new(RecordingPipeline::succeeding()),
            Arc::new(RealFileSystem),
            tmp.path(),
        ),
        Duration::from_millis(20),
    );

    assert!(worker.run_one().await.unwrap().is_none());

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    with_timeout(worker.run(shutdown)).await.unwrap();
    assert!(tmp.path().join("queue").join("pending").is_dir());
}

#[cfg(unix)]
#[tokio::test]
async fn command_pipeline_sees_payload_environment_and_stdin() {
    use forrest::pipeline::CommandPipeline;

    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out.txt");
    let cmd = format!(
        "printf '%s|%s|' \"$FORREST_REPORT_URL\" \"$FORREST_FORCE\" > '{0}' && cat >> '{0}'",
        out.display()
    );
    let pipeline = CommandPipeline::new(cmd);

    let job = payload(JobInput::Inline("from stdin".to_string()));
    pipeline.run(&job).await.unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, "http://reports:3000/|false|from stdin");
}

#[cfg(unix)]
#[tokio::test]
async fn command_pipeline_reports_exit_code() {
    use forrest::pipeline::CommandPipeline;

    let err = CommandPipeline::new("exit 7")
        .run(&payload(JobInput::None))
        .await
        .unwrap_err();
    assert!(matches!(err, ForrestError::PipelineFailed { code: 7 }));
}
