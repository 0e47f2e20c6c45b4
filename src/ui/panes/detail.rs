//! Detail pane for the selected unit
//!
//! Shows, top to bottom: kind and name, location and origin, annotations,
//! the kind-specific details (signature, fields, RPC names), and the stub
//! preview with basic C syntax highlighting.
//!
//! The highlighter is a character-by-character tokenizer; it only needs to
//! color generated code, so it knows line comments, block comments that
//! open and close on the same line, strings and a fixed keyword set.

use super::{clamp_scroll, pane_block, visible_height};
use crate::model::Origin;
use crate::ui::app::UnitEntry;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Simple syntax highlighting for generated C code
fn highlight_c_line(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, n)| n);

        // Comments run to their close, or to the end of the line
        if c == '/' && (next == Some('/') || next == Some('*')) {
            flush_word(&mut spans, &mut current_word, false);
            let rest = &line[offset..];
            let end = if next == Some('*') {
                rest.find("*/").map(|p| p + 2).unwrap_or(rest.len())
            } else {
                rest.len()
            };
            spans.push(Span::styled(
                rest[..end].to_string(),
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            let stop = offset + end;
            while i < chars.len() && chars[i].0 < stop {
                i += 1;
            }
            continue;
        }

        if c == '"' {
            flush_word(&mut spans, &mut current_word, false);
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != '"' {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            end = (end + 1).min(chars.len());
            let stop = chars.get(end).map(|&(o, _)| o).unwrap_or(line.len());
            spans.push(Span::styled(
                line[offset..stop].to_string(),
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush_word(&mut spans, &mut current_word, c == '(');
            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    flush_word(&mut spans, &mut current_word, false);
    Line::from(spans)
}

fn flush_word(spans: &mut Vec<Span<'_>>, word: &mut String, is_function: bool) {
    if word.is_empty() {
        return;
    }
    let style = keyword_style(word, is_function);
    spans.push(Span::styled(std::mem::take(word), style));
}

fn keyword_style(word: &str, is_function: bool) -> Style {
    match word {
        "int" | "char" | "void" | "bool" | "float" | "double" | "long" | "short" | "unsigned"
        | "signed" | "size_t" | "uint8_t" | "uint16_t" | "uint32_t" | "int32_t" => {
            Style::default().fg(DEFAULT_THEME.type_name)
        }
        "struct" | "union" | "enum" | "typedef" | "return" | "if" | "else" | "sizeof"
        | "static" | "extern" | "const" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "NULL" => Style::default().fg(DEFAULT_THEME.number),
        _ if word.chars().all(|c| c.is_ascii_digit()) => Style::default().fg(DEFAULT_THEME.number),
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(DEFAULT_THEME.secondary)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Lines of the detail view for `entry`
fn detail_lines(entry: &UnitEntry) -> Vec<Line<'_>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", entry.kind),
                Style::default().fg(DEFAULT_THEME.keyword),
            ),
            Span::styled(
                entry.name.clone(),
                Style::default()
                    .fg(DEFAULT_THEME.function)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "{} ({})",
                entry.location,
                match entry.origin {
                    Origin::InputFile => "input file",
                    Origin::IncludedFile => "included",
                }
            ),
            Style::default().fg(DEFAULT_THEME.comment),
        )),
        Line::default(),
    ];

    if !entry.annotations.is_empty() {
        lines.push(heading("Annotations"));
        for annotation in &entry.annotations {
            lines.push(Line::from(Span::styled(
                format!("  {}", annotation),
                Style::default().fg(DEFAULT_THEME.annotation),
            )));
        }
        lines.push(Line::default());
    }

    if !entry.details.is_empty() {
        lines.push(heading("Details"));
        for detail in &entry.details {
            let mut line = highlight_c_line(detail);
            line.spans.insert(0, Span::raw("  "));
            lines.push(line);
        }
        lines.push(Line::default());
    }

    if let Some(preview) = &entry.preview {
        lines.push(heading("Generated"));
        lines.extend(preview.lines().map(highlight_c_line));
    }

    lines
}

/// Render the detail pane
pub fn render_detail_pane(
    frame: &mut Frame,
    area: Rect,
    entry: Option<&UnitEntry>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Detail ", is_focused);

    let Some(entry) = entry else {
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "(nothing selected)",
            Style::default().fg(DEFAULT_THEME.comment),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let lines = detail_lines(entry);
    let visible = visible_height(area);
    clamp_scroll(scroll_offset, lines.len(), visible);

    let visible_lines: Vec<Line> = lines.into_iter().skip(*scroll_offset).take(visible).collect();
    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_block_comment() {
        let line = highlight_c_line("\t/* Autogenerated: locals */ int x;");
        let parts = texts(&line);
        assert_eq!(parts[1], "/* Autogenerated: locals */");
        assert!(parts.contains(&"int".to_string()));
        let joined: String = parts.concat();
        assert_eq!(joined, "\t/* Autogenerated: locals */ int x;");
    }

    #[test]
    fn test_highlight_call_and_string() {
        let line = highlight_c_line("send(&_ctx, \"ping\");");
        let parts = texts(&line);
        assert_eq!(parts[0], "send");
        assert_eq!(line.spans[0].style.fg, Some(DEFAULT_THEME.function));
        assert!(parts.contains(&"\"ping\"".to_string()));
        assert_eq!(parts.concat(), "send(&_ctx, \"ping\");");
    }
}
