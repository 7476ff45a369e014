//! Terminal user interface components.
//!
//! This module provides the visual components for the media player,
//! including the stage, the transport bar, and the playlist panel.

mod dialogs;
mod help;
mod playlist;
mod stage;
mod transport;

use crate::app::{App, LayoutRegions};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub use dialogs::render_file_browser;
pub use help::render_help;
pub use playlist::render_playlist;
pub use stage::{render_stage, Spectrum};
pub use transport::render_transport;

/// Width of the playlist panel in columns.
const PLAYLIST_WIDTH: u16 = 36;

/// Calculates the layout regions for the given terminal size.
///
/// Returns the regions used for mouse hit testing along with the footer row.
/// The seek bar and playlist rows are filled in while rendering.
fn calculate_layout(size: Rect) -> (LayoutRegions, Rect) {
    // Main vertical layout: content, transport, footer
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),    // Stage and playlist
            Constraint::Length(4), // Transport
            Constraint::Length(1), // Status / hints
        ])
        .split(size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(PLAYLIST_WIDTH)])
        .split(main_chunks[0]);

    let layout = LayoutRegions {
        stage: content_chunks[0],
        transport: main_chunks[1],
        playlist: content_chunks[1],
        ..LayoutRegions::default()
    };
    (layout, main_chunks[2])
}

/// Renders the complete UI layout and updates layout regions.
///
/// The layout is divided into:
/// - Left: Stage with the spectrum or a video placeholder
/// - Right: Playlist
/// - Bottom: Transport controls and a status line
pub fn render(frame: &mut Frame, app: &mut App) {
    let (mut layout, footer) = calculate_layout(frame.area());

    render_stage(frame, layout.stage, app);
    layout.playlist_rows = render_playlist(frame, layout.playlist, app);
    layout.seek_bar = render_transport(frame, layout.transport, app);
    render_footer(frame, footer, app);

    // Update app's layout regions for mouse hit testing
    app.update_layout(layout);
}

/// Renders the status message, or key hints when there is none.
fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = if let Some((msg, _)) = &app.status_message {
        Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ))
    } else {
        let key_style = Style::default().fg(Color::Yellow);
        let desc_style = Style::default().fg(Color::DarkGray);
        Line::from(vec![
            Span::styled("[o]", key_style),
            Span::styled(" Add files  ", desc_style),
            Span::styled("[Space]", key_style),
            Span::styled(" Play/Pause  ", desc_style),
            Span::styled("[n/p]", key_style),
            Span::styled(" Next/Prev  ", desc_style),
            Span::styled("[e]", key_style),
            Span::styled(" Export  ", desc_style),
            Span::styled("[?]", key_style),
            Span::styled(" Help  ", desc_style),
            Span::styled("[q]", key_style),
            Span::styled(" Quit", desc_style),
        ])
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Shortens `text` to `max_width` characters, ending in "..." when cut.
fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let keep = max_width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("song.mp3", 20), "song.mp3");
        assert_eq!(truncate("a very long file name.mp3", 10), "a very ...");
        assert_eq!(truncate("ééééé", 5), "ééééé");
    }

    #[test]
    fn test_layout_fills_area() {
        let (layout, footer) = calculate_layout(Rect::new(0, 0, 100, 30));
        assert_eq!(layout.playlist.width, PLAYLIST_WIDTH);
        assert_eq!(layout.stage.width, 100 - PLAYLIST_WIDTH);
        assert_eq!(layout.transport.height, 4);
        assert_eq!(footer.y, 29);
    }
}
