use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Marker appended to the displayed log when the backend reports a failed run.
pub const FAILURE_MARKER: &str = "\n\nTASK FAILED.";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: Url,
    pub poll_interval: Duration,
    pub transition_delay: Duration,
    pub download_dir: PathBuf,
    pub user_agent: String,
}

/// Body of `POST /api/start`.
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest<'a> {
    pub task: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub run_id: String,
}

/// Body of `GET /api/status/{run_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
}

impl StatusResponse {
    pub fn run_status(&self) -> RunStatus {
        RunStatus::from_wire(self.status.as_deref())
    }
}

/// Status as the controller understands it. Only `completed` and `failed`
/// are terminal; every other value means the run is still going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("completed") => RunStatus::Completed,
            Some("failed") => RunStatus::Failed,
            _ => RunStatus::Running,
        }
    }
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    Input,
    Progress,
    Result,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Input => "New task",
            View::Progress => "Running",
            View::Result => "Done",
        }
    }
}

/// Downloadable build outputs of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    App,
    Code,
}

impl Artifact {
    pub fn endpoint(self) -> &'static str {
        match self {
            Artifact::App => "download_app",
            Artifact::Code => "download_code",
        }
    }

    /// File name the backend advertises for this artifact.
    pub fn file_name(self, run_id: &str) -> String {
        match self {
            Artifact::App => "application".to_string(),
            Artifact::Code => format!("{run_id}_code.zip"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Artifact::App => "application",
            Artifact::Code => "source code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLinks {
    pub app: String,
    pub code: String,
}

impl DownloadLinks {
    pub fn for_run(base: &Url, run_id: &str) -> Self {
        Self {
            app: crate::api::endpoint(base, &["api", Artifact::App.endpoint(), run_id]).into(),
            code: crate::api::endpoint(base, &["api", Artifact::Code.endpoint(), run_id]).into(),
        }
    }

    pub fn get(&self, artifact: Artifact) -> &str {
        match artifact {
            Artifact::App => &self.app,
            Artifact::Code => &self.code,
        }
    }
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    ViewDeactivated(View),
    ViewActivated(View),
    StartRequested,
    RunStarted { run_id: String },
    StartFailed { message: String },
    /// Full log text; replaces whatever is displayed.
    LogsReplaced(String),
    LogsAppended(String),
    LogsCleared,
    InputCleared,
    ResultReady { run_id: String, links: DownloadLinks },
    RunFinished { run_id: String, outcome: RunOutcome },
    Downloaded { artifact: Artifact, path: PathBuf },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller for status lines.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoEvent {
    Message(String),
    Polling { run_id: String },
    DownloadStarted { artifact: Artifact },
    DownloadFailed { artifact: Artifact, error: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Polling { run_id } => format!("Following run {run_id}"),
            InfoEvent::DownloadStarted { artifact } => {
                format!("Downloading {}…", artifact.label())
            }
            InfoEvent::DownloadFailed { artifact, error } => {
                format!("Download of {} failed: {error}", artifact.label())
            }
        }
    }
}

/// Text shown in the log area. Polls replace it wholesale; only the failure
/// marker and submission errors are written locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBuffer {
    text: String,
}

impl LogBuffer {
    pub fn replace(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Final record of a run, printed in JSON mode and written by `--export-json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub task: String,
    pub base_url: String,
    #[serde(default)]
    pub links: Option<DownloadLinks>,
    pub logs: String,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub finished_at_utc: String,
    #[serde(default)]
    pub downloaded: Vec<PathBuf>,
}
