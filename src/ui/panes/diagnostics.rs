//! Diagnostics pane listing recorded parse errors

use super::{clamp_scroll, pane_block, visible_height};
use crate::errors::RecordedError;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

pub fn render_diagnostics_pane(
    frame: &mut Frame,
    area: Rect,
    errors: &[RecordedError],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let title = format!(" Diagnostics ({}) ", errors.len());
    let block = pane_block(&title, is_focused);
    let visible = visible_height(area);

    if errors.is_empty() {
        let list = List::new(vec![
            ListItem::new("(no errors)").style(Style::default().fg(DEFAULT_THEME.success))
        ])
        .block(block);
        frame.render_widget(list, area);
        return;
    }

    clamp_scroll(scroll_offset, errors.len(), visible);

    let items: Vec<ListItem> = errors
        .iter()
        .skip(*scroll_offset)
        .take(visible)
        .map(|err| {
            let (tag, color) = match err {
                RecordedError::Parse(_) => ("parse ", DEFAULT_THEME.error),
                RecordedError::Malformed(_) => ("decl  ", DEFAULT_THEME.secondary),
            };
            ListItem::new(Line::from(vec![
                Span::styled(tag, Style::default().fg(color)),
                Span::styled(err.to_string(), Style::default().fg(DEFAULT_THEME.fg)),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
