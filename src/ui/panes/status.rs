//! Status bar rendering with counts and keybindings

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const KEY_HINTS: [(&str, &str); 3] = [("↑/↓", "select/scroll"), ("⇥", "focus"), ("q", "quit")];

fn hint_spans() -> Vec<Span<'static>> {
    let key = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc = Style::default().bg(DEFAULT_THEME.selected_bg).fg(DEFAULT_THEME.fg);
    let sep = Style::default().bg(DEFAULT_THEME.selected_bg).fg(DEFAULT_THEME.comment);

    let mut spans = Vec::with_capacity(KEY_HINTS.len() * 3);
    for (i, (k, d)) in KEY_HINTS.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("│ ", sep));
        }
        spans.push(Span::styled(format!(" {} ", k), key));
        spans.push(Span::styled(format!(" {} ", d), desc));
    }
    spans
}

/// Render the status bar at the bottom
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    message: &str,
    files: usize,
    units: usize,
    errors: usize,
) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let bar = Style::default().bg(DEFAULT_THEME.selected_bg);

    let badge_bg = if errors > 0 { DEFAULT_THEME.error } else { DEFAULT_THEME.primary };
    let counts = Line::from(vec![
        Span::styled(
            format!(" {} files | {} units | {} errors ", files, units, errors),
            Style::default().bg(badge_bg).fg(Color::Black).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {} ", message), bar.fg(DEFAULT_THEME.fg)),
    ]);
    frame.render_widget(Paragraph::new(counts).style(bar).alignment(Alignment::Left), halves[0]);

    let hints = Line::from(hint_spans());
    frame.render_widget(Paragraph::new(hints).style(bar).alignment(Alignment::Right), halves[1]);
}
