//! Terminal UI using ratatui

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::App;
use crate::controller::SearchState;

const IDLE_HINT: &str = "Type an address, transaction id or block to search the Bitcoin Gold explorer";

/// Draw the main UI
pub fn draw_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search input
            Constraint::Length(1), // Status line
            Constraint::Min(10),   // Results
            Constraint::Length(3), // Help bar
        ])
        .split(f.area());

    draw_search_input(f, app, chunks[0]);
    draw_status_line(f, app, chunks[1]);

    if app.controller.is_loading() {
        draw_searching(f, chunks[2]);
    } else if app.controller.state() == SearchState::Failed {
        draw_error(f, app, chunks[2]);
    } else {
        draw_results(f, app, chunks[2]);
    }

    draw_help_bar(f, app, chunks[3]);
}

/// Draw search input field
fn draw_search_input(f: &mut Frame, app: &App, area: Rect) {
    let style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let input = Paragraph::new(app.input.as_str()).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                " Search BTG explorer ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(input, area);

    let max_x = area.width.saturating_sub(2);
    let column = u16::try_from(app.cursor_pos()).unwrap_or(u16::MAX).min(max_x);
    f.set_cursor_position((area.x + column + 1, area.y + 1));
}

/// Draw the one-line status (notice, progress or result count)
fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let (text, color) = match app.controller.notice() {
        Some(notice) => (notice, Color::Yellow),
        None => (app.status_message.as_str(), Color::DarkGray),
    };

    f.render_widget(
        Paragraph::new(Span::styled(format!(" {text}"), Style::default().fg(color))),
        area,
    );
}

/// Draw search results list
fn draw_results(f: &mut Frame, app: &App, area: Rect) {
    let results = app.results();

    if results.is_empty() {
        let message = if app.controller.state() == SearchState::Succeeded {
            "No results found"
        } else {
            IDLE_HINT
        };

        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::Gray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Results ")
                    .border_style(Style::default().fg(Color::Gray)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2) as usize;
    let scroll_offset = app.get_scroll_offset(visible_height);

    let items: Vec<ListItem> = results
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height / 4 + 1)
        .map(|(i, result)| {
            let number = format!("{:2}.", i + 1);

            let mut content = vec![Line::from(vec![
                Span::styled(number, Style::default().fg(Color::Yellow)),
                Span::raw(" "),
                Span::styled(
                    truncate(&result.title, 100),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ])];
            content.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(
                    truncate(result.url.as_deref().unwrap_or("-"), 80),
                    Style::default().fg(Color::Blue),
                ),
            ]));
            content.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(truncate(&result.snippet, 100), Style::default().fg(Color::Gray)),
            ]));
            content.push(Line::raw(""));

            let style = if i == app.selected_index {
                Style::default()
                    .bg(Color::Rgb(35, 35, 45))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(content).style(style)
        })
        .collect();

    let title = format!(" Results ({}) ", results.len());

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                title,
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(list, area);
}

/// Draw searching indicator
fn draw_searching(f: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new("Searching...")
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Status ")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

/// Draw error message
fn draw_error(f: &mut Frame, app: &App, area: Rect) {
    let error_text = app.controller.error().unwrap_or("Unknown error");

    let paragraph = Paragraph::new(format!("Error: {error_text}"))
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " Error ",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ))
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

/// Draw help bar
fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.controller.is_loading() {
        "Searching... │ Type to refine │ Esc: Cancel │ Ctrl+Q: Quit"
    } else if app.results().is_empty() {
        "Enter: Search │ Esc: Clear │ Ctrl+Q: Quit"
    } else {
        "↑/↓: Navigate │ Home/End: First/Last │ Ctrl+B: Open in browser │ Enter: Search │ Esc: Clear │ Ctrl+Q: Quit"
    };

    let paragraph = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

/// Truncate string to max length
fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();

    if char_count <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
