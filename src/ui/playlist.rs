//! Playlist rendering.
//!
//! Displays every item with its type glyph, highlighting the item that is
//! loaded and the row selected from the keyboard.

use crate::app::App;
use crate::media::MediaKind;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use super::truncate;

/// Returns the scroll offset that keeps `selected` visible.
fn scroll_for(selected: usize, scroll: usize, visible: usize) -> usize {
    if visible == 0 {
        return 0;
    }
    if selected < scroll {
        selected
    } else if selected >= scroll + visible {
        selected + 1 - visible
    } else {
        scroll
    }
}

/// Renders the playlist panel.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state (the scroll offset is updated)
///
/// # Returns
///
/// The area holding the rows, for mouse hit testing
pub fn render_playlist(frame: &mut Frame, area: Rect, app: &mut App) -> Rect {
    let playlist = app.player.playlist();
    let block = Block::default()
        .title(format!(" {} ({}) ", playlist.name(), playlist.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if playlist.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Playlist is empty",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        return inner;
    }

    let visible = inner.height as usize;
    app.playlist_scroll = scroll_for(app.selected_row, app.playlist_scroll, visible);

    let playlist = app.player.playlist();
    let cursor = playlist.cursor();
    let max_name_len = inner.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = playlist
        .items()
        .iter()
        .enumerate()
        .skip(app.playlist_scroll)
        .take(visible)
        .map(|(i, item)| {
            let is_current = cursor == Some(i);
            let glyph_color = match item.kind {
                MediaKind::Audio => Color::Cyan,
                MediaKind::Video => Color::Magenta,
            };

            let mut name_style = if is_current {
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            if i == app.selected_row {
                name_style = name_style.add_modifier(Modifier::REVERSED);
            }

            ListItem::new(Line::from(vec![
                Span::styled(
                    if is_current { ">" } else { " " },
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    format!("{} ", item.kind.glyph()),
                    Style::default().fg(glyph_color),
                ),
                Span::styled(truncate(&item.name, max_name_len), name_style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), inner);
    inner
}
