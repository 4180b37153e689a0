use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("New task:"),
        key_line("Enter", 7, "Submit task"),
        key_line("Esc", 9, "Quit"),
        key_line("←/→", 9, "Move cursor"),
        Line::from(""),
        Line::from("Running:"),
        key_line("↑/↓", 9, "Scroll log"),
        key_line("PgUp/PgDn", 3, "Scroll log by page"),
        key_line("End", 9, "Follow log"),
        key_line("r", 11, "Start over (after a failure)"),
        Line::from(""),
        Line::from("Done:"),
        key_line("a", 11, "Download application"),
        key_line("c", 11, "Download source code"),
        key_line("y", 11, "Copy application link"),
        key_line("Y", 11, "Copy source code link"),
        key_line("r", 11, "New task"),
        Line::from(""),
        Line::from("Anywhere:"),
        key_line("q", 11, "Quit (outside the editor)"),
        key_line("Ctrl-C", 6, "Quit"),
        key_line("?", 11, "Toggle this help"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
