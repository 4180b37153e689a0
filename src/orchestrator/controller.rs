//! Run lifecycle controller.
//!
//! Owns submission, status polling, result publication and restart, and emits
//! events for presentation layers. All session state lives on the controller
//! task; network calls and transition delays run as spawned tasks that report
//! back through a completion channel.

use super::views::ViewState;
use crate::api::{ApiError, JobApi};
use crate::model::{
    Artifact, DownloadLinks, InfoEvent, RunConfig, RunEvent, RunOutcome, RunStatus,
    StatusResponse, View, FAILURE_MARKER,
};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

/// Commands emitted by UI layers to drive the controller.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UiCommand {
    Submit(String),
    Restart,
    Download(Artifact),
    Quit,
}

/// Results of spawned work, delivered back to the controller task.
enum Completion {
    Started(Result<String, ApiError>),
    Status {
        generation: u64,
        run_id: String,
        result: Result<StatusResponse, ApiError>,
    },
    Activate {
        view: View,
        epoch: u64,
    },
    Downloaded {
        artifact: Artifact,
        result: Result<PathBuf, ApiError>,
    },
}

struct PollLoop {
    generation: u64,
    /// `None` while a status request is in flight.
    next_tick: Option<Instant>,
}

pub(crate) struct RunController<A: JobApi> {
    api: Arc<A>,
    cfg: RunConfig,
    event_tx: UnboundedSender<RunEvent>,
    done_tx: UnboundedSender<Completion>,
    done_rx: Option<UnboundedReceiver<Completion>>,
    current_run_id: Option<String>,
    poll: Option<PollLoop>,
    poll_generation: u64,
    start_in_flight: bool,
    views: ViewState,
    /// Completed run waiting for the Result view to come up.
    pending_result: Option<String>,
    finished_run: Option<String>,
}

impl<A: JobApi> RunController<A> {
    pub fn new(api: Arc<A>, cfg: RunConfig, event_tx: UnboundedSender<RunEvent>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            api,
            cfg,
            event_tx,
            done_tx,
            done_rx: Some(done_rx),
            current_run_id: None,
            poll: None,
            poll_generation: 0,
            start_in_flight: false,
            views: ViewState::default(),
            pending_result: None,
            finished_run: None,
        }
    }

    /// Process commands and completions until `Quit` or the command channel closes.
    pub async fn run(mut self, mut cmd_rx: UnboundedReceiver<UiCommand>) -> Result<()> {
        let Some(mut done_rx) = self.done_rx.take() else {
            anyhow::bail!("controller is already running");
        };

        loop {
            let next_tick = self.poll.as_ref().and_then(|p| p.next_tick);
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(UiCommand::Submit(task)) => self.submit(&task),
                    Some(UiCommand::Restart) => self.restart(),
                    Some(UiCommand::Download(artifact)) => self.download(artifact),
                    Some(UiCommand::Quit) | None => break,
                },
                Some(done) = done_rx.recv() => self.on_completion(done),
                _ = sleep_until(next_tick) => self.tick(),
            }
        }

        self.reset();
        Ok(())
    }

    fn emit(&self, ev: RunEvent) {
        let _ = self.event_tx.send(ev);
    }

    fn spawn_completion<F>(&self, fut: F)
    where
        F: std::future::Future<Output = Completion> + Send + 'static,
    {
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    fn is_busy(&self) -> bool {
        self.start_in_flight || self.poll.is_some()
    }

    pub fn submit(&mut self, text: &str) {
        let task = text.trim();
        if task.is_empty() {
            tracing::debug!("ignoring empty task");
            return;
        }
        if self.views.current() != Some(View::Input) || self.start_in_flight {
            tracing::warn!("submit ignored: a run is already under way");
            return;
        }

        self.transition(View::Progress);
        self.start_in_flight = true;
        self.emit(RunEvent::StartRequested);

        let api = self.api.clone();
        let task = task.to_string();
        self.spawn_completion(async move { Completion::Started(api.start(&task).await) });
    }

    /// Replace any poll loop with a fresh one. The first tick fires one interval from now.
    pub fn start_polling(&mut self) {
        self.poll_generation += 1;
        self.poll = Some(PollLoop {
            generation: self.poll_generation,
            next_tick: Some(Instant::now() + self.cfg.poll_interval),
        });
        tracing::debug!(generation = self.poll_generation, "poll loop started");
    }

    fn stop_polling(&mut self) {
        if self.poll.take().is_some() {
            tracing::debug!(generation = self.poll_generation, "poll loop stopped");
        }
    }

    fn schedule_next_tick(&mut self) {
        if let Some(poll) = self.poll.as_mut() {
            poll.next_tick = Some(Instant::now() + self.cfg.poll_interval);
        }
    }

    fn tick(&mut self) {
        let Some(poll) = self.poll.as_mut() else {
            return;
        };
        poll.next_tick = None;
        let Some(run_id) = self.current_run_id.clone() else {
            poll.next_tick = Some(Instant::now() + self.cfg.poll_interval);
            return;
        };

        let generation = poll.generation;
        let api = self.api.clone();
        self.spawn_completion(async move {
            let result = api.status(&run_id).await;
            Completion::Status {
                generation,
                run_id,
                result,
            }
        });
    }

    fn show_result(&mut self, run_id: String) {
        self.pending_result = Some(run_id);
        self.transition(View::Result);
    }

    /// Publish links and the outcome once the Result view is up.
    fn publish_result(&mut self) {
        let Some(run_id) = self.pending_result.take() else {
            return;
        };
        let links = DownloadLinks::for_run(&self.cfg.base_url, &run_id);
        self.finished_run = Some(run_id.clone());
        self.emit(RunEvent::ResultReady {
            run_id: run_id.clone(),
            links,
        });
        self.emit(RunEvent::RunFinished {
            run_id,
            outcome: RunOutcome::Completed,
        });
    }

    pub fn restart(&mut self) {
        match self.views.current() {
            Some(View::Result) => {}
            Some(View::Progress) if !self.is_busy() => {}
            Some(View::Progress) => {
                self.emit(RunEvent::Info(InfoEvent::Message(
                    "Run still in progress".into(),
                )));
                return;
            }
            _ => {
                tracing::debug!("restart ignored on input view");
                return;
            }
        }

        self.reset();
        self.transition(View::Input);
        self.emit(RunEvent::InputCleared);
        self.emit(RunEvent::LogsCleared);
    }

    /// Drop all per-run session state.
    fn reset(&mut self) {
        self.stop_polling();
        self.current_run_id = None;
        self.pending_result = None;
        self.finished_run = None;
    }

    fn download(&mut self, artifact: Artifact) {
        let Some(run_id) = self.finished_run.clone() else {
            self.emit(RunEvent::Info(InfoEvent::Message(
                "No completed run to download yet.".into(),
            )));
            return;
        };

        self.emit(RunEvent::Info(InfoEvent::DownloadStarted { artifact }));
        let api = self.api.clone();
        let dir = self.cfg.download_dir.clone();
        self.spawn_completion(async move {
            Completion::Downloaded {
                artifact,
                result: api.download(artifact, &run_id, &dir).await,
            }
        });
    }

    fn transition(&mut self, to: View) {
        let (left, epoch) = self.views.begin(to);
        if let Some(view) = left {
            self.emit(RunEvent::ViewDeactivated(view));
        }
        let delay = self.cfg.transition_delay;
        self.spawn_completion(async move {
            tokio::time::sleep(delay).await;
            Completion::Activate { view: to, epoch }
        });
    }

    fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::Started(result) => self.on_started(result),
            Completion::Status {
                generation,
                run_id,
                result,
            } => self.on_status(generation, run_id, result),
            Completion::Activate { view, epoch } => {
                if self.views.activate(view, epoch) {
                    self.emit(RunEvent::ViewActivated(view));
                    if view == View::Result {
                        self.publish_result();
                    }
                }
            }
            Completion::Downloaded { artifact, result } => match result {
                Ok(path) => self.emit(RunEvent::Downloaded { artifact, path }),
                Err(e) => {
                    tracing::error!(error = %e, "download failed");
                    self.emit(RunEvent::Info(InfoEvent::DownloadFailed {
                        artifact,
                        error: e.to_string(),
                    }));
                }
            },
        }
    }

    fn on_started(&mut self, result: Result<String, ApiError>) {
        self.start_in_flight = false;
        match result {
            Ok(run_id) => {
                tracing::info!(run_id = %run_id, "run started");
                self.current_run_id = Some(run_id.clone());
                self.emit(RunEvent::RunStarted {
                    run_id: run_id.clone(),
                });
                self.emit(RunEvent::Info(InfoEvent::Polling { run_id }));
                self.start_polling();
            }
            Err(e) => {
                tracing::error!(error = %e, "Error starting task");
                let message = format!("Error starting task: {e}");
                self.emit(RunEvent::LogsReplaced(message.clone()));
                self.emit(RunEvent::StartFailed { message });
            }
        }
    }

    fn on_status(
        &mut self,
        generation: u64,
        run_id: String,
        result: Result<StatusResponse, ApiError>,
    ) {
        if self.poll.as_ref().map(|p| p.generation) != Some(generation) {
            tracing::debug!(generation, "dropping status from a cancelled poll loop");
            return;
        }

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Polling error");
                self.schedule_next_tick();
                return;
            }
        };

        if let Some(logs) = status.logs.as_deref().filter(|l| !l.is_empty()) {
            self.emit(RunEvent::LogsReplaced(logs.to_string()));
        }

        match status.run_status() {
            RunStatus::Completed => {
                self.stop_polling();
                let run_id = status.run_id.unwrap_or(run_id);
                tracing::info!(run_id = %run_id, "run completed");
                self.show_result(run_id);
            }
            RunStatus::Failed => {
                self.stop_polling();
                tracing::warn!(run_id = %run_id, "run failed");
                self.emit(RunEvent::LogsAppended(FAILURE_MARKER.to_string()));
                self.emit(RunEvent::RunFinished {
                    run_id,
                    outcome: RunOutcome::Failed,
                });
            }
            RunStatus::Running => self.schedule_next_tick(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => futures::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{status, unavailable, FakeApi};
    use crate::model::LogBuffer;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    fn cfg() -> RunConfig {
        RunConfig {
            base_url: reqwest::Url::parse("http://runner.test").unwrap(),
            poll_interval: Duration::from_secs(2),
            transition_delay: Duration::from_millis(500),
            download_dir: PathBuf::from("/tmp/downloads"),
            user_agent: "test".into(),
        }
    }

    struct Harness {
        api: Arc<FakeApi>,
        cmd_tx: UnboundedSender<UiCommand>,
        event_rx: UnboundedReceiver<RunEvent>,
        seen: Vec<RunEvent>,
        _handle: JoinHandle<Result<()>>,
    }

    impl Harness {
        fn new(api: FakeApi) -> Self {
            Self::with_setup(api, |_| {})
        }

        fn with_setup(api: FakeApi, setup: impl FnOnce(&mut RunController<FakeApi>)) -> Self {
            let api = Arc::new(api);
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
            let mut controller = RunController::new(api.clone(), cfg(), event_tx);
            setup(&mut controller);
            let handle = tokio::spawn(controller.run(cmd_rx));
            Self {
                api,
                cmd_tx,
                event_rx,
                seen: Vec::new(),
                _handle: handle,
            }
        }

        fn send(&self, cmd: UiCommand) {
            self.cmd_tx.send(cmd).unwrap();
        }

        /// Receive events until one matches `pred`; panics after a minute of virtual time.
        async fn wait_for(&mut self, pred: impl Fn(&RunEvent) -> bool) -> RunEvent {
            loop {
                let ev = tokio::time::timeout(Duration::from_secs(60), self.event_rx.recv())
                    .await
                    .expect("timed out waiting for event")
                    .expect("controller stopped");
                self.seen.push(ev.clone());
                if pred(&ev) {
                    return ev;
                }
            }
        }

        /// Let `d` of virtual time pass, collecting whatever was emitted.
        async fn idle(&mut self, d: Duration) {
            tokio::time::sleep(d).await;
            while let Ok(ev) = self.event_rx.try_recv() {
                self.seen.push(ev);
            }
        }

        fn logs(&self) -> LogBuffer {
            let mut logs = LogBuffer::default();
            for ev in &self.seen {
                match ev {
                    RunEvent::LogsReplaced(text) => logs.replace(text.clone()),
                    RunEvent::LogsAppended(text) => logs.append(text),
                    RunEvent::LogsCleared => logs.clear(),
                    _ => {}
                }
            }
            logs
        }

        fn saw(&self, pred: impl Fn(&RunEvent) -> bool) -> bool {
            self.seen.iter().any(pred)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submit_sends_trimmed_task_and_enters_progress_after_delay() {
        let mut h = Harness::new(FakeApi::default());
        let t0 = Instant::now();
        h.send(UiCommand::Submit("  build a todo app  ".into()));

        h.wait_for(|e| *e == RunEvent::ViewActivated(View::Progress))
            .await;
        assert!(t0.elapsed() >= Duration::from_millis(500));
        assert_eq!(h.api.starts(), vec!["build a todo app".to_string()]);
        assert_eq!(h.seen[0], RunEvent::ViewDeactivated(View::Input));
        assert!(h.saw(|e| *e == RunEvent::StartRequested));
        assert!(h.saw(|e| matches!(e, RunEvent::RunStarted { run_id } if run_id == "run-1")));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_submit_does_nothing() {
        let mut h = Harness::new(FakeApi::default());
        h.send(UiCommand::Submit(" \t\n ".into()));
        h.idle(Duration::from_secs(5)).await;

        assert!(h.api.starts().is_empty());
        assert!(h.seen.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_submit_while_running_is_ignored() {
        let mut h = Harness::new(FakeApi::default());
        h.send(UiCommand::Submit("first".into()));
        h.send(UiCommand::Submit("second".into()));
        h.idle(Duration::from_secs(3)).await;

        assert_eq!(h.api.starts(), vec!["first".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_shows_result_with_links() {
        let api = FakeApi::with_statuses(vec![
            Ok(status("running", None)),
            Ok(status("running", Some("step 1"))),
            Ok(status("completed", Some("L"))),
        ]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("make a game".into()));

        h.wait_for(|e| *e == RunEvent::ViewActivated(View::Result))
            .await;
        assert_eq!(h.api.status_call_count(), 3);
        assert_eq!(h.logs().as_str(), "L");
        assert!(h.saw(|e| *e == RunEvent::ViewDeactivated(View::Progress)));
        assert!(h.saw(|e| matches!(
            e,
            RunEvent::ResultReady { run_id, links }
                if run_id == "run-1"
                    && links.app == "http://runner.test/api/download_app/run-1"
                    && links.code == "http://runner.test/api/download_code/run-1"
        )));
        assert!(h.saw(|e| matches!(
            e,
            RunEvent::RunFinished { outcome: RunOutcome::Completed, .. }
        )));

        h.idle(Duration::from_secs(10)).await;
        assert_eq!(h.api.status_call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn result_uses_run_id_reported_by_status() {
        let api = FakeApi::with_statuses(vec![Ok(StatusResponse {
            run_id: Some("run_20260101".into()),
            status: Some("completed".into()),
            logs: None,
        })]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("x".into()));

        let ev = h
            .wait_for(|e| matches!(e, RunEvent::ResultReady { .. }))
            .await;
        let RunEvent::ResultReady { run_id, links } = ev else {
            unreachable!()
        };
        assert_eq!(run_id, "run_20260101");
        assert!(links.app.ends_with("/api/download_app/run_20260101"));
    }

    #[tokio::test(start_paused = true)]
    async fn links_are_published_once_result_view_is_active() {
        let api = FakeApi::with_statuses(vec![Ok(status("completed", Some("done")))]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("x".into()));

        h.wait_for(|e| *e == RunEvent::ViewDeactivated(View::Progress))
            .await;
        let left_progress = Instant::now();
        assert!(!h.saw(|e| matches!(e, RunEvent::ResultReady { .. })));

        h.wait_for(|e| matches!(e, RunEvent::RunFinished { .. }))
            .await;
        assert!(left_progress.elapsed() >= Duration::from_millis(500));
        let pos = |pred: &dyn Fn(&RunEvent) -> bool| h.seen.iter().position(pred);
        let activated = pos(&|e| *e == RunEvent::ViewActivated(View::Result));
        let ready = pos(&|e| matches!(e, RunEvent::ResultReady { .. }));
        let finished = pos(&|e| matches!(e, RunEvent::RunFinished { .. }));
        assert!(activated.is_some());
        assert!(activated < ready && ready < finished);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_appends_marker_and_stays_on_progress() {
        let api = FakeApi::with_statuses(vec![Ok(status("failed", Some("oops")))]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("doomed".into()));

        h.wait_for(|e| matches!(e, RunEvent::RunFinished { .. }))
            .await;
        h.idle(Duration::from_secs(10)).await;

        assert_eq!(h.logs().as_str(), "oops\n\nTASK FAILED.");
        assert_eq!(h.api.status_call_count(), 1);
        assert!(h.saw(|e| *e == RunEvent::ViewActivated(View::Progress)));
        assert!(!h.saw(|e| *e == RunEvent::ViewActivated(View::Result)));
        assert!(!h.saw(|e| matches!(e, RunEvent::ResultReady { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_keeps_polling() {
        let api = FakeApi::with_statuses(vec![
            Ok(status("queued", None)),
            Ok(status("queued", None)),
            Ok(status("queued", None)),
        ]);
        let mut h = Harness::new(api);
        let t0 = Instant::now();
        h.send(UiCommand::Submit("wait".into()));
        h.idle(Duration::from_millis(7_500)).await;

        assert_eq!(
            h.api.status_call_offsets(t0),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(6)
            ]
        );
        assert!(!h.saw(|e| *e == RunEvent::ViewDeactivated(View::Progress)));
        assert!(!h.saw(|e| matches!(e, RunEvent::RunFinished { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_logs_do_not_clear_display() {
        let api = FakeApi::with_statuses(vec![
            Ok(status("running", Some("compiling"))),
            Ok(status("running", Some(""))),
        ]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("x".into()));
        h.idle(Duration::from_secs(5)).await;

        assert_eq!(h.api.status_call_count(), 2);
        assert_eq!(h.logs().as_str(), "compiling");
    }

    #[tokio::test(start_paused = true)]
    async fn starting_poll_twice_yields_one_tick_stream() {
        let api = FakeApi::with_statuses(vec![
            Ok(status("running", None)),
            Ok(status("running", None)),
            Ok(status("completed", Some("L"))),
        ]);
        let t0 = Instant::now();
        let mut h = Harness::with_setup(api, |c| {
            c.current_run_id = Some("run-7".into());
            c.start_polling();
            c.start_polling();
        });

        h.wait_for(|e| matches!(e, RunEvent::RunFinished { .. }))
            .await;
        assert_eq!(
            h.api.status_call_offsets(t0),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(6)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_status_delays_next_tick() {
        let api = FakeApi::default();
        api.push_status(Duration::from_secs(5), Ok(status("running", None)));
        api.push_status(Duration::ZERO, Ok(status("completed", None)));
        let t0 = Instant::now();
        let mut h = Harness::with_setup(api, |c| {
            c.current_run_id = Some("run-slow".into());
            c.start_polling();
        });

        h.wait_for(|e| matches!(e, RunEvent::RunFinished { .. }))
            .await;
        assert_eq!(
            h.api.status_call_offsets(t0),
            vec![Duration::from_secs(2), Duration::from_secs(9)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tick_without_run_id_is_a_no_op() {
        let mut h = Harness::with_setup(FakeApi::default(), |c| c.start_polling());
        h.idle(Duration::from_secs(7)).await;

        assert_eq!(h.api.status_call_count(), 0);
        assert!(h.seen.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_errors_are_retried() {
        let api = FakeApi::with_statuses(vec![
            Err(unavailable()),
            Err(unavailable()),
            Ok(status("completed", Some("done"))),
        ]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("flaky".into()));

        h.wait_for(|e| *e == RunEvent::ViewActivated(View::Result))
            .await;
        assert_eq!(h.api.status_call_count(), 3);
        assert_eq!(h.logs().as_str(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn start_error_is_shown_and_restart_recovers() {
        let api = FakeApi::default();
        api.push_start(Err(unavailable()));
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("first try".into()));

        h.wait_for(|e| matches!(e, RunEvent::StartFailed { .. }))
            .await;
        h.idle(Duration::from_secs(5)).await;
        assert!(h
            .logs()
            .as_str()
            .starts_with("Error starting task: http://runner.test/api returned HTTP 503"));
        assert!(h.saw(|e| *e == RunEvent::ViewActivated(View::Progress)));
        assert_eq!(h.api.status_call_count(), 0);

        h.send(UiCommand::Restart);
        h.wait_for(|e| *e == RunEvent::ViewActivated(View::Input))
            .await;
        assert!(h.saw(|e| *e == RunEvent::InputCleared));
        assert!(h.logs().is_empty());

        h.send(UiCommand::Submit("second try".into()));
        h.wait_for(|e| matches!(e, RunEvent::RunStarted { .. }))
            .await;
        assert_eq!(h.api.starts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_from_result_clears_and_returns_to_input() {
        let api = FakeApi::with_statuses(vec![Ok(status("completed", Some("L")))]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("x".into()));
        h.wait_for(|e| *e == RunEvent::ViewActivated(View::Result))
            .await;

        let t_restart = Instant::now();
        h.send(UiCommand::Restart);
        h.wait_for(|e| *e == RunEvent::ViewActivated(View::Input))
            .await;

        assert!(t_restart.elapsed() >= Duration::from_millis(500));
        assert!(h.saw(|e| *e == RunEvent::ViewDeactivated(View::Result)));
        assert!(h.saw(|e| *e == RunEvent::InputCleared));
        assert!(h.logs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_failure_is_allowed() {
        let api = FakeApi::with_statuses(vec![Ok(status("failed", Some("boom")))]);
        let mut h = Harness::new(api);
        h.send(UiCommand::Submit("x".into()));
        h.wait_for(|e| matches!(e, RunEvent::RunFinished { .. }))
            .await;

        h.send(UiCommand::Restart);
        h.wait_for(|e| *e == RunEvent::ViewActivated(View::Input))
            .await;
        assert!(h.logs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_is_refused_while_polling() {
        let mut h = Harness::new(FakeApi::default());
        h.send(UiCommand::Submit("long job".into()));
        h.wait_for(|e| matches!(e, RunEvent::RunStarted { .. }))
            .await;

        h.send(UiCommand::Restart);
        h.idle(Duration::from_secs(5)).await;

        assert!(h.saw(|e| matches!(
            e,
            RunEvent::Info(InfoEvent::Message(m)) if m == "Run still in progress"
        )));
        assert!(!h.saw(|e| *e == RunEvent::ViewActivated(View::Input)));
        assert!(h.api.status_call_count() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn download_requires_a_completed_run() {
        let api = FakeApi::with_statuses(vec![Ok(status("completed", None))]);
        let mut h = Harness::new(api);

        h.send(UiCommand::Download(Artifact::App));
        h.wait_for(|e| matches!(e, RunEvent::Info(InfoEvent::Message(_))))
            .await;

        h.send(UiCommand::Submit("x".into()));
        h.wait_for(|e| matches!(e, RunEvent::ResultReady { .. }))
            .await;
        h.send(UiCommand::Download(Artifact::Code));
        let ev = h
            .wait_for(|e| matches!(e, RunEvent::Downloaded { .. }))
            .await;
        assert_eq!(
            ev,
            RunEvent::Downloaded {
                artifact: Artifact::Code,
                path: PathBuf::from("/tmp/downloads/run-1_code.zip"),
            }
        );
    }
}
