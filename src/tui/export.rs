use super::state::UiState;
use crate::model::RunSummary;
use anyhow::Result;
use std::path::Path;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Build the summary of the run currently shown, if it has finished.
pub fn summary_from_state(state: &UiState) -> Option<RunSummary> {
    Some(RunSummary {
        run_id: state.run_id.clone()?,
        outcome: state.outcome?,
        task: state.task.clone(),
        base_url: state.base_url.clone(),
        links: state.links.clone(),
        logs: state.logs.as_str().to_string(),
        elapsed: state.run_start.map(|t| t.elapsed()).unwrap_or_default(),
        finished_at_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        downloaded: state.downloaded.clone(),
    })
}

/// Export the finished run to `path` and report the outcome on the status line.
pub fn export_and_show_path(path: &Path, state: &mut UiState) {
    let Some(summary) = summary_from_state(state) else {
        state.info = "No finished run to export yet.".into();
        return;
    };
    match crate::orchestrator::export_summary(path, &summary) {
        Ok(()) => state.info = format!("Exported JSON: {}", path.display()),
        Err(e) => state.info = format!("Export JSON failed: {e:#}"),
    }
}

/// Initialize the clipboard manager thread if not already initialized.
/// This creates a background thread that processes clipboard operations sequentially,
/// keeping each clipboard instance alive for a sufficient duration.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        // Clipboard managers on Linux read lazily from the owning instance.
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Copy text to clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
