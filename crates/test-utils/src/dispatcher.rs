use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use forrest::backend::{JobId, JobResult};
use forrest::dispatch::{JobDispatcher, JobHandle};
use forrest::errors::Result;
use forrest::types::InputSource;

/// A fake dispatcher that records the input of every submission and hands
/// back an already-succeeded handle.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    submitted: Arc<Mutex<Vec<Option<InputSource>>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<Option<InputSource>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

impl JobDispatcher for RecordingDispatcher {
    fn submit<'a>(
        &'a self,
        input: Option<&'a InputSource>,
    ) -> Pin<Box<dyn Future<Output = Result<JobHandle>> + Send + 'a>> {
        Box::pin(async move {
            self.submitted.lock().unwrap().push(input.cloned());
            let id = JobId::generate();
            Ok(JobHandle::completed(
                id.clone(),
                Ok(JobResult::succeeded(id)),
            ))
        })
    }
}
