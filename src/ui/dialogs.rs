//! Dialog overlays.
//!
//! Provides the file browser used to add audio and video files.

use crate::app::App;
use crate::media::MediaKind;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};
use ratatui::Frame;
use std::path::Path;

use super::centered_rect;

/// Truncates a path string to fit within max_width, adding "..." prefix if needed.
#[inline]
fn truncate_path(path_str: &str, max_width: usize) -> String {
    let len = path_str.chars().count();
    if len > max_width {
        let tail: String = path_str
            .chars()
            .skip(len - max_width.saturating_sub(3))
            .collect();
        format!("...{}", tail)
    } else {
        path_str.to_string()
    }
}

/// Extracts the display name from a path, returning "?" if extraction fails.
#[inline]
fn path_display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("?")
        .to_string()
}

/// Renders the file browser overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `app` - Application state
pub fn render_file_browser(frame: &mut Frame, app: &App) {
    if !app.file_browser.open {
        return;
    }

    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);

    let title = if app.file_browser.marked.is_empty() {
        " Add Media ".to_string()
    } else {
        format!(" Add Media ({} marked) ", app.file_browser.marked.len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Split into path display and file list
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Current path
            Constraint::Length(1), // Separator
            Constraint::Min(5),    // File list
            Constraint::Length(1), // Instructions
        ])
        .split(inner);

    // Current directory
    let path_str = app.file_browser.current_dir.display().to_string();
    let max_width = chunks[0].width.saturating_sub(2) as usize;
    let display_path = truncate_path(&path_str, max_width);

    frame.render_widget(
        Paragraph::new(Span::styled(display_path, Style::default().fg(Color::Cyan))),
        chunks[0],
    );

    // File list
    let visible_height = chunks[2].height as usize;
    let start_idx = app.file_browser.scroll;
    let end_idx = (start_idx + visible_height).min(app.file_browser.entries.len());

    let items: Vec<ListItem> = app.file_browser.entries[start_idx.min(end_idx)..end_idx]
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let idx = start_idx + i;
            let is_selected = idx == app.file_browser.selected;

            let (icon, name, style) = if path == Path::new("..") {
                (
                    "[..]".to_string(),
                    "Parent Directory".to_string(),
                    Style::default().fg(Color::Blue),
                )
            } else if path.is_dir() {
                (
                    "[D]".to_string(),
                    path_display_name(path),
                    Style::default().fg(Color::Blue),
                )
            } else {
                let mark = if app.file_browser.marked.contains(path) {
                    "x"
                } else {
                    " "
                };
                let color = match MediaKind::from_path(path) {
                    Some(MediaKind::Video) => Color::Magenta,
                    _ => Color::White,
                };
                (format!("[{}]", mark), path_display_name(path), Style::default().fg(color))
            };

            let display_style = if is_selected {
                style.add_modifier(Modifier::REVERSED)
            } else {
                style
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", icon), Style::default().fg(Color::DarkGray)),
                Span::styled(name, display_style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), chunks[2]);

    // Instructions
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Up/Down]", Style::default().fg(Color::Yellow)),
            Span::styled(" Navigate  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Space]", Style::default().fg(Color::Yellow)),
            Span::styled(" Mark  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Enter]", Style::default().fg(Color::Yellow)),
            Span::styled(" Open/Add  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" Cancel", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[3],
    );
}
