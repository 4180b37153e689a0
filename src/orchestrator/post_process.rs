//! Post-run processing utilities.
//!
//! Handles artifact downloads and summary export once a run reaches a
//! terminal state.

use crate::api::JobApi;
use crate::model::{Artifact, RunOutcome, RunSummary};
use anyhow::{Context, Result};
use std::path::Path;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub summary: RunSummary,
    pub messages: Vec<String>,
}

/// Download artifacts of a completed run into `download_dir` (when given) and
/// export the summary to `export_path` (when given).
///
/// Failures are reported as messages; the summary is returned either way.
pub(crate) async fn process_run_completion<A: JobApi>(
    api: &A,
    download_dir: Option<&Path>,
    export_path: Option<&Path>,
    mut summary: RunSummary,
) -> ProcessedRun {
    let mut messages = Vec::new();

    if let (Some(dir), RunOutcome::Completed) = (download_dir, summary.outcome) {
        for artifact in [Artifact::App, Artifact::Code] {
            match api.download(artifact, &summary.run_id, dir).await {
                Ok(path) => {
                    messages.push(format!("Downloaded {}: {}", artifact.label(), path.display()));
                    summary.downloaded.push(path);
                }
                Err(e) => {
                    tracing::error!(error = %e, "download failed");
                    messages.push(format!("Download of {} failed: {e}", artifact.label()));
                }
            }
        }
    }

    if let Some(path) = export_path {
        match export_summary(path, &summary) {
            Ok(()) => messages.push(format!("Exported JSON: {}", path.display())),
            Err(e) => messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    ProcessedRun { summary, messages }
}

/// Write `summary` as pretty JSON, creating parent directories as needed.
pub(crate) fn export_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
