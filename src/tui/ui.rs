use crate::core::menu::MenuEntry;
use crate::core::session::View;

use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};
use unicode_width::UnicodeWidthChar;

pub const TITLE: &str = " flakeframe | setup ";
const LABEL_WIDTH: usize = 20;
const PROMPT: &str = ">... ";
const MAX_BOX_WIDTH: u16 = 72;

pub fn draw_setup(frame: &mut Frame, view: &View<'_>) {
    let area = frame.area();
    let width = area.width.min(MAX_BOX_WIDTH);
    let inner_width = width.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = view
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| entry_line(view, entry, i == view.cursor))
        .collect();

    let mut prompt_row = None;
    if view.searching {
        lines.push(Line::default());
        prompt_row = Some(lines.len());
        lines.extend(search_lines(view, inner_width));
    } else if let Some(status) = view.status {
        lines.push(Line::default());
        lines.push(status_line(status));
    }

    let height = (lines.len() as u16).saturating_add(2);
    let area = centered(area, width, height);
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(TITLE)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);

    frame.render_widget(Paragraph::new(lines).block(block), area);

    if let Some(row) = prompt_row {
        place_cursor(frame, inner, row, view.query);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

fn entry_line<'a>(view: &View<'_>, entry: &'a MenuEntry, focused: bool) -> Line<'a> {
    let marker = if focused { "> " } else { "  " };
    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::styled(marker, label_style),
        Span::styled(format!("{:<LABEL_WIDTH$}", entry.label()), label_style),
    ];

    if let MenuEntry::Choice { key, .. } = entry {
        let current = view.settings.index(*key);
        for (i, option) in crate::core::settings::Settings::labels(*key).into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", Style::default().add_modifier(Modifier::DIM)));
            }
            let style = if i == current {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            spans.push(Span::styled(option, style));
        }
    }

    Line::from(spans)
}

fn search_lines<'a>(view: &View<'a>, width: usize) -> Vec<Line<'a>> {
    let live_style = if view.live_coordinate().is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(PROMPT, Style::default().fg(Color::Cyan)),
            Span::raw(view.query),
        ]),
        Line::styled(view.live_status(), live_style),
    ];

    if let Some(status) = view.status {
        lines.push(status_line(status));
    }

    // Two columns for the selection marker.
    let room = width.saturating_sub(2);
    for (i, name) in view.suggestions.names().iter().enumerate() {
        let selected = view.selected_suggestion == Some(i);
        let (marker, style) = if selected {
            ("> ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        } else {
            ("  ", Style::default().add_modifier(Modifier::DIM))
        };
        lines.push(Line::from(vec![
            Span::styled(marker, style),
            Span::styled(truncate_to_width(name, room), style),
        ]));
    }

    lines
}

fn status_line(status: &str) -> Line<'_> {
    Line::styled(status, Style::default().fg(Color::Yellow))
}

fn place_cursor(frame: &mut Frame, inner: Rect, row: usize, query: &str) {
    let col = PROMPT.len() + display_width(query);
    let x = inner.x.saturating_add(col as u16).min(inner.right().saturating_sub(1));
    let y = inner.y.saturating_add(row as u16);
    if y < inner.bottom() {
        frame.set_cursor_position((x, y));
    }
}

fn display_width(s: &str) -> usize {
    s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Cuts `s` so it occupies at most `max` terminal columns, marking the cut
/// with an ellipsis.
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if display_width(s) <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}
