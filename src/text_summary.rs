//! Text summary builder for CLI output.
//!
//! Formats the human-readable lines printed at the end of a `--text` run.

use crate::model::{RunOutcome, RunSummary};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn format_elapsed(elapsed: std::time::Duration) -> String {
    // Whole seconds only.
    humantime::format_duration(std::time::Duration::from_secs(elapsed.as_secs())).to_string()
}

/// Build a text summary from a finished run.
pub(crate) fn build_text_summary(summary: &RunSummary) -> TextSummary {
    let mut lines = Vec::new();

    let outcome = match summary.outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Failed => "FAILED",
    };
    lines.push(format!("Run {}: {outcome}", summary.run_id));
    lines.push(format!("Task: {}", summary.task));
    lines.push(format!("Elapsed: {}", format_elapsed(summary.elapsed)));

    if let Some(links) = summary.links.as_ref() {
        lines.push(format!("Application: {}", links.app));
        lines.push(format!("Source code: {}", links.code));
    }
    for path in &summary.downloaded {
        lines.push(format!("Saved: {}", path.display()));
    }

    TextSummary { lines }
}
