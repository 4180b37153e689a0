//! Scripted in-memory backend for tests.

use super::{ApiError, JobApi};
use crate::model::{Artifact, StatusResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

struct Scripted {
    delay: Duration,
    result: Result<StatusResponse, ApiError>,
}

/// Pops scripted responses in order; once the status script runs out every
/// poll reports `running`.
#[derive(Default)]
pub(crate) struct FakeApi {
    start_results: Mutex<VecDeque<Result<String, ApiError>>>,
    statuses: Mutex<VecDeque<Scripted>>,
    starts: Mutex<Vec<String>>,
    status_calls: Mutex<Vec<(Instant, String)>>,
}

impl FakeApi {
    pub fn with_statuses(statuses: Vec<Result<StatusResponse, ApiError>>) -> Self {
        let api = FakeApi::default();
        for result in statuses {
            api.push_status(Duration::ZERO, result);
        }
        api
    }

    pub fn push_start(&self, result: Result<String, ApiError>) {
        self.start_results.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, delay: Duration, result: Result<StatusResponse, ApiError>) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Scripted { delay, result });
    }

    pub fn starts(&self) -> Vec<String> {
        self.starts.lock().unwrap().clone()
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }

    pub fn status_call_offsets(&self, origin: Instant) -> Vec<Duration> {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| at.duration_since(origin))
            .collect()
    }
}

#[async_trait]
impl JobApi for FakeApi {
    async fn start(&self, task: &str) -> Result<String, ApiError> {
        self.starts.lock().unwrap().push(task.to_string());
        let scripted = self.start_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok("run-1".to_string()))
    }

    async fn status(&self, run_id: &str) -> Result<StatusResponse, ApiError> {
        self.status_calls
            .lock()
            .unwrap()
            .push((Instant::now(), run_id.to_string()));
        let scripted = self.statuses.lock().unwrap().pop_front();
        match scripted {
            Some(s) => {
                tokio::time::sleep(s.delay).await;
                s.result
            }
            None => Ok(status("running", None)),
        }
    }

    async fn download(
        &self,
        artifact: Artifact,
        run_id: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, ApiError> {
        Ok(dest_dir.join(artifact.file_name(run_id)))
    }
}

pub(crate) fn status(s: &str, logs: Option<&str>) -> StatusResponse {
    StatusResponse {
        run_id: None,
        status: Some(s.to_string()),
        logs: logs.map(str::to_string),
    }
}

pub(crate) fn unavailable() -> ApiError {
    ApiError::Status {
        url: "http://runner.test/api".into(),
        status: 503,
    }
}
