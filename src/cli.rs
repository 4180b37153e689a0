use crate::api::{HttpJobApi, JobApi};
use crate::logging::{self, LogTarget};
use crate::model::{DownloadLinks, LogBuffer, RunConfig, RunEvent, RunOutcome, RunSummary};
use crate::orchestrator::{self, RunController, UiCommand};
use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
#[derive(Debug, PartialEq)]
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "task-runner",
    version,
    about = "Submit a task to a job runner and follow it to completion"
)]
pub struct Cli {
    /// Base URL of the job runner backend
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Task description; pre-fills the TUI input and is required with --text/--json
    #[arg(long)]
    pub task: Option<String>,

    /// Print the run summary as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Stream logs and print a text summary (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,

    /// Interval between status polls
    #[arg(long, default_value = "2s")]
    pub poll_interval: humantime::Duration,

    /// Delay between leaving one screen and showing the next
    #[arg(long, default_value = "500ms")]
    pub transition_delay: humantime::Duration,

    /// Directory for downloaded artifacts; headless modes download both after completion
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Export the final run summary as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Log file used while the TUI is running
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.silent || self.json || self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }
    if args.is_headless() && args.task.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(anyhow::anyhow!("--text and --json need a non-empty --task"));
    }

    if args.silent {
        logging::init(LogTarget::ErrorsOnly)?;
        return run_headless(args, OutputMode::Silent).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            let log_path = args.log_file.clone().unwrap_or_else(logging::default_log_path);
            logging::init(LogTarget::File(&log_path))?;
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            return Err(anyhow::anyhow!(
                "built without TUI support; use --text or --json with --task"
            ));
        }
    }

    logging::init(LogTarget::Stderr)?;
    if args.json {
        return run_headless(args, OutputMode::Json).await;
    }
    run_headless(args, OutputMode::Text).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<RunConfig> {
    let base_url = Url::parse(&args.base_url)
        .with_context(|| format!("invalid --base-url {:?}", args.base_url))?;
    if base_url.cannot_be_a_base() {
        anyhow::bail!("--base-url must be an http(s) URL, got {:?}", args.base_url);
    }
    let poll_interval = Duration::from(args.poll_interval);
    if poll_interval.is_zero() {
        anyhow::bail!("--poll-interval must be greater than zero");
    }

    Ok(RunConfig {
        base_url,
        poll_interval,
        transition_delay: Duration::from(args.transition_delay),
        download_dir: args
            .download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".")),
        user_agent: format!("task-runner/{}", env!("CARGO_PKG_VERSION")),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
    Silent,
}

/// Submit a task, follow it to a terminal state, then download/export and print.
async fn run_headless(args: Cli, mode: OutputMode) -> Result<()> {
    let cfg = build_config(&args)?;
    let api = Arc::new(HttpJobApi::new(&cfg)?);
    let task = args.task.clone().unwrap_or_default();

    let (out_tx, out_handle) = if mode == OutputMode::Silent {
        (None, None)
    } else {
        let (tx, handle) = spawn_output_writer();
        (Some(tx), Some(handle))
    };
    // Only text mode streams logs while the run is going.
    let stream_to = if mode == OutputMode::Text {
        out_tx.as_ref()
    } else {
        None
    };

    let result = follow_run(api.clone(), cfg, &task, stream_to).await;
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            drop(out_tx);
            if let Some(handle) = out_handle {
                let _ = handle.await;
            }
            return Err(e);
        }
    };

    let processed = orchestrator::process_run_completion(
        api.as_ref(),
        args.download_dir.as_deref(),
        args.export_json.as_deref(),
        summary,
    )
    .await;
    let summary = processed.summary;

    if let Some(tx) = out_tx.as_ref() {
        for msg in &processed.messages {
            let _ = tx.send(OutputLine::Stderr(msg.clone()));
        }
        match mode {
            OutputMode::Json => {
                let out = serde_json::to_string_pretty(&summary)?;
                let _ = tx.send(OutputLine::Stdout(out));
            }
            _ => {
                for line in crate::text_summary::build_text_summary(&summary).lines {
                    let _ = tx.send(OutputLine::Stdout(line));
                }
            }
        }
    }

    drop(out_tx);
    if let Some(handle) = out_handle {
        let _ = handle.await;
    }

    match summary.outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Failed => Err(anyhow::anyhow!("run {} failed", summary.run_id)),
    }
}

/// The part of `next` not yet printed, given the previously displayed `prev`.
fn log_delta<'a>(prev: &str, next: &'a str) -> &'a str {
    match next.strip_prefix(prev) {
        Some(rest) if !prev.is_empty() => rest.strip_prefix('\n').unwrap_or(rest),
        _ => next,
    }
}

/// Drive one run through the controller and collect its summary.
///
/// New log output is streamed to `out` as stderr lines when given.
pub(crate) async fn follow_run<A: JobApi>(
    api: Arc<A>,
    cfg: RunConfig,
    task: &str,
    out: Option<&mpsc::UnboundedSender<OutputLine>>,
) -> Result<RunSummary> {
    let base_url = cfg.base_url.to_string();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let controller = RunController::new(api, cfg, event_tx);
    let handle = tokio::spawn(controller.run(cmd_rx));

    let started = tokio::time::Instant::now();
    let _ = cmd_tx.send(UiCommand::Submit(task.to_string()));

    let print = |line: &str| {
        if let Some(tx) = out {
            let _ = tx.send(OutputLine::Stderr(line.to_string()));
        }
    };

    let mut logs = LogBuffer::default();
    let mut links: Option<DownloadLinks> = None;
    let finished = loop {
        let Some(ev) = event_rx.recv().await else {
            break Err(anyhow::anyhow!("controller stopped before the run finished"));
        };
        match ev {
            RunEvent::LogsReplaced(text) => {
                log_delta(logs.as_str(), &text).lines().for_each(print);
                logs.replace(text);
            }
            RunEvent::LogsAppended(text) => {
                text.lines().filter(|l| !l.is_empty()).for_each(print);
                logs.append(&text);
            }
            RunEvent::RunStarted { run_id } => print(&format!("Run id: {run_id}")),
            RunEvent::StartFailed { message } => break Err(anyhow::anyhow!(message)),
            RunEvent::ResultReady { links: l, .. } => links = Some(l),
            RunEvent::RunFinished { run_id, outcome } => break Ok((run_id, outcome)),
            RunEvent::Info(info) => print(&info.to_message()),
            _ => {}
        }
    };

    let _ = cmd_tx.send(UiCommand::Quit);
    handle.await.context("controller task failed")??;
    let (run_id, outcome) = finished?;

    Ok(RunSummary {
        run_id,
        outcome,
        task: task.trim().to_string(),
        base_url,
        links,
        logs: logs.as_str().to_string(),
        elapsed: started.elapsed(),
        finished_at_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        downloaded: Vec::new(),
    })
}
