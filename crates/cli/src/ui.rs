//! # TUI Rendering Logic
//!
//! Draws the chat session: a sidebar with the few-shot editor and the token
//! slider, and a main column with the conversation, the last result table, the
//! question input and a status bar.

use crate::app::{App, Focus};
use chatsql::constants::{MAX_MAX_NEW_TOKENS, MIN_MAX_NEW_TOKENS};
use chatsql::types::display_value;
use chatsql::Role;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap},
};

/// The main rendering function.
pub fn ui(frame: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Min(0)])
        .split(frame.size());

    render_sidebar(frame, app, columns[0]);

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),     // Conversation
            Constraint::Length(9),  // Result table
            Constraint::Length(3),  // Question input
            Constraint::Length(1),  // Status bar
        ])
        .split(columns[1]);

    render_chat(frame, app, main_layout[0]);
    render_result(frame, app, main_layout[1]);
    render_input(frame, app, main_layout[2]);
    render_status_bar(frame, app, main_layout[3]);
}

fn focus_style(app: &App, focus: Focus) -> Style {
    if app.focus == focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let editor = Paragraph::new(app.examples.as_str())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Few-shot Examples <Ctrl+S>")
                .borders(Borders::ALL)
                .border_style(focus_style(app, Focus::Examples)),
        );
    frame.render_widget(editor, chunks[0]);

    let span = (MAX_MAX_NEW_TOKENS - MIN_MAX_NEW_TOKENS) as f64;
    let ratio = (app.max_new_tokens - MIN_MAX_NEW_TOKENS) as f64 / span;
    let slider = Gauge::default()
        .block(
            Block::default()
                .title("max_new_tokens <PgUp/PgDn>")
                .borders(Borders::ALL),
        )
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(app.max_new_tokens.to_string());
    frame.render_widget(slider, chunks[1]);

    if app.focus == Focus::Examples {
        let inner = chunks[0].inner(Margin::new(1, 1));
        let last_line = app.examples.split('\n').last().unwrap_or("");
        let line_count = app.examples.split('\n').count().max(1) as u16;
        frame.set_cursor(
            inner.x + (last_line.chars().count() as u16).min(inner.width.saturating_sub(1)),
            inner.y + (line_count - 1).min(inner.height.saturating_sub(1)),
        );
    }
}

fn render_chat(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    for (role, content) in app.visible_messages() {
        let (label, color) = match role {
            Role::User => ("you", Color::Green),
            Role::Assistant => ("catbot", Color::Magenta),
        };
        lines.push(Line::from(Span::styled(
            format!("{label}:"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for text in content.lines() {
            lines.push(Line::from(format!("  {text}")));
        }
        lines.push(Line::from(""));
    }

    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;
    let title = if app.busy {
        "ChatSQL (thinking...)"
    } else {
        "ChatSQL"
    };
    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(chat, area);
}

fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    let mode = format!("{:?} mode, <F2> to switch", app.answer_mode);

    let Some(result) = &app.last_result else {
        let block = Block::default()
            .title(format!("Result ({mode})"))
            .borders(Borders::ALL);
        frame.render_widget(Paragraph::new("No rows yet.").block(block), area);
        return;
    };

    let header_cells = result
        .columns
        .iter()
        .map(|h| Cell::from(h.as_str()).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);
    let rows = result
        .rows
        .iter()
        .map(|row| Row::new(row.iter().map(|v| Cell::from(display_value(v)))));

    let count = result.columns.len().max(1) as u32;
    let widths = vec![Constraint::Ratio(1, count); result.columns.len()];
    let title = if result.is_truncated() {
        format!(
            "Result: first {} of {} rows ({mode})",
            result.rows.len(),
            result.total_rows
        )
    } else {
        format!("Result: {} rows ({mode})", result.total_rows)
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let input = Paragraph::new(app.question.as_str()).block(
        Block::default()
            .title("Question <Enter>")
            .borders(Borders::ALL)
            .border_style(focus_style(app, Focus::Question)),
    );
    frame.render_widget(input, area);

    if app.focus == Focus::Question {
        let offset = input_cursor_offset(&app.question, area.width);
        frame.set_cursor(area.x + 1 + offset, area.y + 1);
    }
}

/// Column of the question cursor inside a bordered box `width` cells wide.
fn input_cursor_offset(question: &str, width: u16) -> u16 {
    let typed = u16::try_from(question.chars().count()).unwrap_or(u16::MAX);
    typed.min(width.saturating_sub(2))
}

/// Renders the bottom status bar.
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(app.status.as_str())
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(status, area);
}
