use crate::model::{DownloadLinks, LogBuffer, RunEvent, RunOutcome, View};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::path::PathBuf;
use std::time::Instant;

pub struct UiState {
    /// Active view; `None` while a transition is under way.
    pub view: Option<View>,
    pub show_help: bool,
    pub info: String,
    pub base_url: String,

    // Task editor
    pub input: String,
    pub cursor: usize, // char index into `input`

    // Log window
    pub logs: LogBuffer,
    pub follow_logs: bool,
    pub log_scroll: usize,

    pub task: String,
    pub run_id: Option<String>,
    pub busy: bool,
    pub outcome: Option<RunOutcome>,
    pub run_start: Option<Instant>,
    pub links: Option<DownloadLinks>,
    pub downloaded: Vec<PathBuf>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            view: Some(View::Input),
            show_help: false,
            info: String::new(),
            base_url: String::new(),
            input: String::new(),
            cursor: 0,
            logs: LogBuffer::default(),
            follow_logs: true,
            log_scroll: 0,
            task: String::new(),
            run_id: None,
            busy: false,
            outcome: None,
            run_start: None,
            links: None,
            downloaded: Vec::new(),
        }
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

impl UiState {
    pub fn apply_event(&mut self, ev: RunEvent) {
        match ev {
            RunEvent::ViewDeactivated(view) => {
                if self.view == Some(view) {
                    self.view = None;
                }
            }
            RunEvent::ViewActivated(view) => self.view = Some(view),
            RunEvent::StartRequested => {
                self.busy = true;
                self.outcome = None;
                self.run_id = None;
                self.links = None;
                self.downloaded.clear();
                self.run_start = Some(Instant::now());
                self.info = "Starting run…".into();
            }
            RunEvent::RunStarted { run_id } => {
                self.info = format!("Run {run_id} started");
                self.run_id = Some(run_id);
            }
            RunEvent::StartFailed { message } => {
                self.busy = false;
                self.info = format!("{message} (r to start over)");
            }
            RunEvent::LogsReplaced(text) => {
                self.logs.replace(text);
                self.follow_logs = true;
            }
            RunEvent::LogsAppended(text) => {
                self.logs.append(&text);
                self.follow_logs = true;
            }
            RunEvent::LogsCleared => {
                self.logs.clear();
                self.follow_logs = true;
                self.log_scroll = 0;
            }
            RunEvent::InputCleared => {
                self.busy = false;
                self.input.clear();
                self.cursor = 0;
                self.task.clear();
                self.run_id = None;
                self.links = None;
                self.outcome = None;
                self.downloaded.clear();
                self.run_start = None;
                self.info.clear();
            }
            RunEvent::ResultReady { run_id, links } => {
                self.run_id = Some(run_id);
                self.links = Some(links);
            }
            RunEvent::RunFinished { run_id, outcome } => {
                self.busy = false;
                self.outcome = Some(outcome);
                self.info = match outcome {
                    RunOutcome::Completed => format!("Run {run_id} completed"),
                    RunOutcome::Failed => format!("Run {run_id} failed (r to start over)"),
                };
            }
            RunEvent::Downloaded { artifact, path } => {
                self.info = format!("Saved {}: {}", artifact.label(), path.display());
                self.downloaded.push(path);
            }
            RunEvent::Info(info) => self.info = info.to_message(),
        }
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.input.chars().count();
        self.cursor = self.cursor.saturating_add_signed(delta).min(len);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// First visible log line for a window `height` lines tall.
    pub fn log_offset(&self, height: usize) -> usize {
        let max = self.logs.line_count().saturating_sub(height);
        if self.follow_logs {
            max
        } else {
            self.log_scroll.min(max)
        }
    }

    pub fn scroll_logs_up(&mut self, lines: usize, height: usize) {
        self.log_scroll = self.log_offset(height).saturating_sub(lines);
        self.follow_logs = false;
    }

    pub fn scroll_logs_down(&mut self, lines: usize, height: usize) {
        let max = self.logs.line_count().saturating_sub(height);
        self.log_scroll = (self.log_offset(height) + lines).min(max);
        self.follow_logs = self.log_scroll >= max;
    }

    pub fn follow(&mut self) {
        self.follow_logs = true;
    }
}
