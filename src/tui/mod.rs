mod export;
mod help;
mod state;

use crate::api::HttpJobApi;
use crate::cli::{build_config, Cli};
use crate::model::{Artifact, RunEvent, RunOutcome, View};
use crate::orchestrator::{RunController, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Terminal,
};
use state::UiState;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;
    let api = Arc::new(HttpJobApi::new(&cfg)?);

    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RunEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = RunController::new(api, cfg, event_tx).run(cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq)]
enum KeyAction {
    None,
    Send(UiCommand),
    Copy(Artifact),
    Quit,
}

/// Apply a key press to local UI state. `page` is the log window height.
fn handle_key(state: &mut UiState, key: KeyEvent, page: usize) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    if state.show_help {
        match key.code {
            KeyCode::Char('?') | KeyCode::Esc => state.show_help = false,
            KeyCode::Char('q') => return KeyAction::Quit,
            _ => {}
        }
        return KeyAction::None;
    }

    match state.view {
        Some(View::Input) => match key.code {
            KeyCode::Enter => {
                let text = state.input.clone();
                if !text.trim().is_empty() {
                    state.task = text.trim().to_string();
                }
                return KeyAction::Send(UiCommand::Submit(text));
            }
            KeyCode::Esc => return KeyAction::Quit,
            KeyCode::Backspace => state.backspace(),
            KeyCode::Delete => state.delete(),
            KeyCode::Left => state.move_cursor(-1),
            KeyCode::Right => state.move_cursor(1),
            KeyCode::Home => state.cursor_home(),
            KeyCode::End => state.cursor_end(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                state.insert_char(c)
            }
            _ => {}
        },
        Some(View::Progress) => match key.code {
            KeyCode::Up | KeyCode::Char('k') => state.scroll_logs_up(1, page),
            KeyCode::Down | KeyCode::Char('j') => state.scroll_logs_down(1, page),
            KeyCode::PageUp => state.scroll_logs_up(page.max(1), page),
            KeyCode::PageDown => state.scroll_logs_down(page.max(1), page),
            KeyCode::End => state.follow(),
            KeyCode::Char('r') => return KeyAction::Send(UiCommand::Restart),
            KeyCode::Char('q') => return KeyAction::Quit,
            KeyCode::Char('?') => state.show_help = true,
            _ => {}
        },
        Some(View::Result) => match key.code {
            KeyCode::Char('a') => return KeyAction::Send(UiCommand::Download(Artifact::App)),
            KeyCode::Char('c') => return KeyAction::Send(UiCommand::Download(Artifact::Code)),
            KeyCode::Char('y') => return KeyAction::Copy(Artifact::App),
            KeyCode::Char('Y') => return KeyAction::Copy(Artifact::Code),
            KeyCode::Char('r') => return KeyAction::Send(UiCommand::Restart),
            KeyCode::Char('q') => return KeyAction::Quit,
            KeyCode::Char('?') => state.show_help = true,
            _ => {}
        },
        None => match key.code {
            KeyCode::Char('q') => return KeyAction::Quit,
            KeyCode::Char('?') => state.show_help = true,
            _ => {}
        },
    }
    KeyAction::None
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<RunEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        base_url: args.base_url.clone(),
        ..Default::default()
    };
    if let Some(task) = args.task.as_deref() {
        task.chars().for_each(|c| state.insert_char(c));
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now() - tick_rate;
    let mut log_height = 10usize;

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            let finished = matches!(ev, RunEvent::RunFinished { .. });
            state.apply_event(ev);
            if finished {
                if let Some(path) = args.export_json.as_deref() {
                    export::export_and_show_path(path, &mut state);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| log_height = draw(f.area(), f, &state))
                .ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k, log_height) {
                    KeyAction::None => {}
                    KeyAction::Send(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyAction::Copy(artifact) => match state.links.as_ref() {
                        Some(links) => match export::copy_to_clipboard(links.get(artifact)) {
                            Ok(()) => {
                                state.info = format!("✓ Copied {} link", artifact.label())
                            }
                            Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
                        },
                        None => state.info = "No links yet.".into(),
                    },
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
                // Redraw right away so typing feels immediate.
                last_tick = Instant::now() - tick_rate;
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Draw the whole screen and return the height of the log window.
fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) -> usize {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    draw_steps(chunks[0], f, state);

    let mut log_height = chunks[1].height.saturating_sub(2) as usize;
    match state.view {
        Some(View::Input) => draw_input(chunks[1], f, state),
        Some(View::Progress) => log_height = draw_progress(chunks[1], f, state),
        Some(View::Result) => draw_result(chunks[1], f, state),
        None => {
            f.render_widget(Block::default().borders(Borders::ALL).title("…"), chunks[1]);
        }
    }

    let status = Paragraph::new(Line::from(state.info.clone()))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[2]);

    if state.show_help {
        help::draw_help(centered_rect(60, 80, area), f);
    }
    log_height
}

fn draw_steps(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = Vec::new();
    for (i, view) in [View::Input, View::Progress, View::Result].into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
        }
        let style = if state.view == Some(view) {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("{} {}", i + 1, view.title()), style));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("task-runner"));
    f.render_widget(p, area);
}

fn draw_input(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    // Single-line editor that scrolls horizontally to keep the cursor visible.
    let width = rows[0].width.saturating_sub(2).max(1) as usize;
    let start = state.cursor.saturating_sub(width - 1);
    let visible: String = state.input.chars().skip(start).take(width).collect();
    let editor = Paragraph::new(visible).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Describe the task"),
    );
    f.render_widget(editor, rows[0]);
    f.set_cursor_position((
        rows[0].x + 1 + (state.cursor - start) as u16,
        rows[0].y + 1,
    ));

    let mut lines = Vec::new();
    push_key_hint(&mut lines, "Enter", "submit");
    push_key_hint(&mut lines, "Esc", "quit");
    lines.push(Line::from(""));
    state::push_wrapped_status_kv(&mut lines, "Backend", &state.base_url, rows[1].width);
    let hints = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(hints, rows[1]);
}

/// Returns the number of log lines that fit in the window.
fn draw_progress(area: Rect, f: &mut ratatui::Frame, state: &UiState) -> usize {
    let height = area.height.saturating_sub(2) as usize;
    let title = match (state.run_id.as_deref(), state.outcome) {
        (Some(id), Some(RunOutcome::Failed)) => Line::from(vec![
            Span::raw(format!("Run {id} ")),
            Span::styled("failed", Style::default().fg(Color::Red)),
        ]),
        (Some(id), _) => Line::from(format!("Run {id}")),
        (None, _) if state.busy => Line::from("Starting…"),
        (None, _) => Line::from("Not started"),
    };
    let follow = if state.follow_logs { "" } else { " (scrolled, End to follow)" };
    let offset = state.log_offset(height);
    let p = Paragraph::new(state.logs.as_str().to_string())
        .scroll((offset.min(u16::MAX as usize) as u16, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(format!("Log{follow}"))),
        );
    f.render_widget(p, area);
    height
}

fn draw_result(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = Vec::new();
    let run_id = state.run_id.as_deref().unwrap_or("-");
    lines.push(Line::from(vec![
        Span::raw(format!("Run {run_id} ")),
        Span::styled("completed", Style::default().fg(Color::Green)),
    ]));
    if let Some(start) = state.run_start {
        let secs = start.elapsed().as_secs();
        lines.push(Line::from(format!(
            "Started {} ago",
            humantime::format_duration(Duration::from_secs(secs))
        )));
    }
    lines.push(Line::from(""));
    if let Some(links) = state.links.as_ref() {
        state::push_wrapped_status_kv(&mut lines, "Application", &links.app, area.width);
        state::push_wrapped_status_kv(&mut lines, "Source code", &links.code, area.width);
    }
    for path in &state.downloaded {
        state::push_wrapped_status_kv(
            &mut lines,
            "Saved",
            &path.display().to_string(),
            area.width,
        );
    }
    lines.push(Line::from(""));
    push_key_hint(&mut lines, "a / c", "download application / source code");
    push_key_hint(&mut lines, "y / Y", "copy application / source code link");
    push_key_hint(&mut lines, "r", "start a new task");

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Result"));
    f.render_widget(p, area);
}

fn push_key_hint(lines: &mut Vec<Line<'static>>, key: &'static str, what: &'static str) {
    lines.push(Line::from(vec![
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(format!("  {what}")),
    ]));
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
