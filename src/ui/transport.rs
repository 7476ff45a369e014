//! Transport controls rendering.
//!
//! Displays play state, navigation availability, elapsed and total time,
//! the seek gauge, mute and volume, and the export control.

use crate::app::App;
use crate::media::format_time;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

/// Renders the transport bar.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
///
/// # Returns
///
/// The seek gauge area, for mouse hit testing
pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) -> Rect {
    let active = app.player.is_active();
    let block = Block::default()
        .title(" Transport ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if active { Color::Cyan } else { Color::Gray }));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    // Divide into sections
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12), // Play state
            Constraint::Length(8),  // Previous / next
            Constraint::Length(16), // Time
            Constraint::Length(4),  // Mute
            Constraint::Length(14), // Volume
            Constraint::Min(14),    // Export
        ])
        .split(rows[0]);

    let state = app.player.transport();

    let play_status = if !active {
        Span::styled(" [.] IDLE ", Style::default().fg(Color::DarkGray))
    } else if state.playing {
        Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " [||] PAUSE ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    let playlist = app.player.playlist();
    let nav_style = |enabled: bool| {
        if enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("|<", nav_style(playlist.has_previous())),
            Span::raw("  "),
            Span::styled(">|", nav_style(playlist.has_next())),
        ])),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format_time(state.current_time),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" / ", Style::default().fg(Color::DarkGray)),
            Span::styled(format_time(state.duration), Style::default().fg(Color::White)),
        ])),
        chunks[2],
    );

    let mute = if state.muted_for_display() {
        Span::styled("M", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("V", Style::default().fg(Color::Green))
    };
    frame.render_widget(Paragraph::new(Line::from(mute)), chunks[3]);

    let volume = state.displayed_volume();
    let volume_pct = (volume * 100.0).round() as u16;
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
            .ratio(f64::from(volume).clamp(0.0, 1.0))
            .label(format!("{}%", volume_pct)),
        chunks[4],
    );

    let export = if app.exporting {
        Span::styled(
            " Exporting...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(" [e] Export", Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(Paragraph::new(Line::from(export)), chunks[5]);

    // Seek gauge
    let seek_bar = rows[1];
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
            .ratio(state.progress().clamp(0.0, 1.0))
            .label(""),
        seek_bar,
    );
    seek_bar
}
