//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`units`]: Extracted declarations, one row per unit, with the selection
//! - [`detail`]: Signature, fields, annotations, RPC names and stub preview of
//!   the selected unit
//! - [`diagnostics`]: Errors recorded while parsing
//! - [`status`]: Status bar with counts and keybindings
//!
//! Each module exports one `render_*` function. Panes that scroll take the
//! offset as `&mut usize` and clamp it to their content.

pub mod detail;
pub mod diagnostics;
pub mod status;
pub mod units;

pub use detail::render_detail_pane;
pub use diagnostics::render_diagnostics_pane;
pub use status::render_status_bar;
pub use units::render_units_pane;

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders},
};

fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Rows available inside a bordered pane, min 1
fn visible_height(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}

/// Keep `offset` within the scrollable range for `total` rows
fn clamp_scroll(offset: &mut usize, total: usize, visible: usize) {
    if total > visible {
        *offset = (*offset).min(total - visible);
    } else {
        *offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_scroll() {
        let mut offset = 10;
        clamp_scroll(&mut offset, 12, 5);
        assert_eq!(offset, 7);

        clamp_scroll(&mut offset, 3, 5);
        assert_eq!(offset, 0);
    }
}
