//! Unit list pane

use super::{clamp_scroll, pane_block, visible_height};
use crate::model::Origin;
use crate::ui::app::UnitEntry;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Render the unit list, keeping the selected row in view
pub fn render_units_pane(
    frame: &mut Frame,
    area: Rect,
    entries: &[UnitEntry],
    selected: usize,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Units ", is_focused);
    let visible = visible_height(area);

    if entries.is_empty() {
        let list = List::new(vec![
            ListItem::new("(no declarations)").style(Style::default().fg(DEFAULT_THEME.comment))
        ])
        .block(block);
        frame.render_widget(list, area);
        return;
    }

    // Scroll just enough to show the selection
    if selected < *scroll_offset {
        *scroll_offset = selected;
    } else if selected >= *scroll_offset + visible {
        *scroll_offset = selected + 1 - visible;
    }
    clamp_scroll(scroll_offset, entries.len(), visible);

    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible)
        .map(|(idx, entry)| {
            let marker = if entry.annotations.is_empty() { "  " } else { "@ " };
            let name_style = if entry.origin == Origin::IncludedFile {
                Style::default().fg(DEFAULT_THEME.comment)
            } else {
                Style::default().fg(DEFAULT_THEME.fg)
            };

            let mut spans = vec![
                Span::styled(marker, Style::default().fg(DEFAULT_THEME.annotation)),
                Span::styled(
                    format!("{:<12}", entry.kind),
                    Style::default().fg(DEFAULT_THEME.kind_color(entry.kind)),
                ),
                Span::styled(entry.name.clone(), name_style),
            ];
            if idx == selected {
                let highlight = Style::default()
                    .bg(DEFAULT_THEME.selected_bg)
                    .add_modifier(Modifier::BOLD);
                for span in &mut spans {
                    span.style = span.style.patch(highlight);
                }
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
