use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forrest::backend::JobPayload;
use forrest::errors::{ForrestError, Result};
use forrest::pipeline::Pipeline;

/// A fake pipeline that:
/// - records every payload it was handed
/// - optionally sleeps, to keep the run lock held for a while
/// - succeeds, or fails with a fixed exit code.
#[derive(Clone, Default)]
pub struct RecordingPipeline {
    calls: Arc<Mutex<Vec<JobPayload>>>,
    fail_with: Option<i32>,
    delay: Option<Duration>,
}

impl RecordingPipeline {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(code: i32) -> Self {
        Self {
            fail_with: Some(code),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<JobPayload> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Pipeline for RecordingPipeline {
    fn run<'a>(
        &'a self,
        payload: &'a JobPayload,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(payload.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.fail_with {
                Some(code) => Err(ForrestError::PipelineFailed { code }),
                None => Ok(()),
            }
        })
    }
}
