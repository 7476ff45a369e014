//! Help overlay rendering.
//!
//! Displays keyboard shortcuts and mouse controls in a modal overlay.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Key binding entry for the help display.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const GENERAL_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "?",
        description: "Toggle this help",
    },
    KeyBinding {
        key: "q",
        description: "Quit",
    },
    KeyBinding {
        key: "Ctrl+C",
        description: "Force quit",
    },
];

const PLAYBACK_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Space",
        description: "Play / Pause",
    },
    KeyBinding {
        key: "Left / Right",
        description: "Seek back / forward 5 seconds",
    },
    KeyBinding {
        key: "+ / -",
        description: "Volume up / down",
    },
    KeyBinding {
        key: "m",
        description: "Toggle mute",
    },
];

const PLAYLIST_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "n / p",
        description: "Next / previous item",
    },
    KeyBinding {
        key: "Up / Down",
        description: "Move playlist selection",
    },
    KeyBinding {
        key: "Enter",
        description: "Play selected item",
    },
    KeyBinding {
        key: "o",
        description: "Add audio or video files",
    },
    KeyBinding {
        key: "e",
        description: "Export playlist to playlist.zip",
    },
];

const BROWSER_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Space",
        description: "Mark / unmark file",
    },
    KeyBinding {
        key: "Enter",
        description: "Open directory or add files",
    },
    KeyBinding {
        key: "Esc",
        description: "Close browser",
    },
];

const MOUSE_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Click row",
        description: "Play playlist item",
    },
    KeyBinding {
        key: "Click bar",
        description: "Seek to position",
    },
    KeyBinding {
        key: "Scroll",
        description: "Scroll this help",
    },
];

/// Renders the help overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `scroll` - Vertical scroll offset
pub fn render_help(frame: &mut Frame, scroll: u16) {
    let area = centered_rect(60, 70, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Scrollable content
            Constraint::Length(1), // Fixed footer
        ])
        .split(inner);

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(Color::White);

    let sections: [(&str, &[KeyBinding]); 5] = [
        ("General", GENERAL_BINDINGS),
        ("Playback", PLAYBACK_BINDINGS),
        ("Playlist", PLAYLIST_BINDINGS),
        ("File Browser", BROWSER_BINDINGS),
        ("Mouse Controls", MOUSE_BINDINGS),
    ];

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (title, bindings) in sections {
        lines.push(Line::from(Span::styled(title, section_style)));
        for binding in bindings {
            lines.push(Line::from(vec![
                Span::styled(format!("{:15}", binding.key), key_style),
                Span::styled(binding.description, desc_style),
            ]));
        }
        lines.push(Line::from(""));
    }

    // Clamp scroll so the last line stays reachable
    let max_scroll = (lines.len() as u16).saturating_sub(chunks[0].height);
    let scroll = scroll.min(max_scroll);

    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), chunks[0]);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Up/Down]", Style::default().fg(Color::Yellow)),
            Span::styled(" Scroll  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[?/Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" Close", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[1],
    );
}
