//! Stage rendering.
//!
//! Shows the spectrum for audio items, a placeholder for video items, and an
//! idle message when nothing is loaded.

use crate::app::App;
use crate::audio::visualizer::{bar_layout, BACKGROUND};
use crate::media::MediaKind;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::Frame;

use super::truncate;

/// Partial block glyphs, one per eighth of a cell.
const EIGHTHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bar spectrum drawn with eighth-height block glyphs.
pub struct Spectrum<'a> {
    magnitudes: &'a [u8],
    block: Option<Block<'a>>,
}

impl<'a> Spectrum<'a> {
    pub fn new(magnitudes: &'a [u8]) -> Self {
        Self {
            magnitudes,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for Spectrum<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        // Clear the canvas to the background before drawing bars
        let (r, g, b) = BACKGROUND;
        buf.set_style(inner, Style::default().bg(Color::Rgb(r, g, b)));
        for y in inner.top()..inner.bottom() {
            for x in inner.left()..inner.right() {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_char(' ');
                }
            }
        }

        let eighths = u32::from(inner.height) * 8;
        for bar in bar_layout(self.magnitudes, inner.width, eighths) {
            let (r, g, b) = bar.color;
            let full_rows = (bar.height / 8) as u16;
            let remainder = (bar.height % 8) as usize;

            for col in bar.x..bar.x + bar.width {
                let x = inner.x + col;
                for row in 0..full_rows {
                    let y = inner.bottom() - 1 - row;
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(EIGHTHS[7]).set_fg(Color::Rgb(r, g, b));
                    }
                }
                if remainder > 0 && full_rows < inner.height {
                    let y = inner.bottom() - 1 - full_rows;
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(EIGHTHS[remainder - 1])
                            .set_fg(Color::Rgb(r, g, b));
                    }
                }
            }
        }
    }
}

/// Renders the stage panel.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_stage(frame: &mut Frame, area: Rect, app: &App) {
    let Some(item) = app.player.playlist().current() else {
        render_message(
            frame,
            area,
            " Stage ",
            vec![
                Line::from(Span::styled(
                    "No media loaded",
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press o to add audio or video files",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        );
        return;
    };

    let max_title = area.width.saturating_sub(6) as usize;
    let title = format!(" {} ", truncate(&item.name, max_title));

    if !app.player.is_active() {
        render_message(
            frame,
            area,
            &title,
            vec![Line::from(Span::styled(
                format!("Cannot play {}", item.name),
                Style::default().fg(Color::Red),
            ))],
        );
        return;
    }

    match item.kind {
        MediaKind::Audio => {
            let block = Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan));
            frame.render_widget(
                Spectrum::new(app.player.visualizer().magnitudes()).block(block),
                area,
            );
        }
        MediaKind::Video => render_message(
            frame,
            area,
            &title,
            vec![
                Line::from(Span::styled(
                    format!("{} {}", item.kind.glyph(), item.name),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Video frames are not shown in the terminal",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        ),
    }
}

/// Renders a bordered panel with vertically centered text.
fn render_message(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'static>>) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let top_pad = inner.height.saturating_sub(lines.len() as u16) / 2;
    let text_area = Rect {
        y: inner.y + top_pad,
        height: inner.height - top_pad,
        ..inner
    };
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        text_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::visualizer::FREQUENCY_BIN_COUNT;

    fn cell(buf: &Buffer, x: u16, y: u16) -> &ratatui::buffer::Cell {
        &buf[(x, y)]
    }

    #[test]
    fn test_spectrum_paints_background_when_silent() {
        let area = Rect::new(0, 0, 16, 4);
        let mut buf = Buffer::empty(area);
        let mags = [0u8; FREQUENCY_BIN_COUNT];
        Spectrum::new(&mags).render(area, &mut buf);

        for y in 0..4 {
            for x in 0..16 {
                assert_eq!(cell(&buf, x, y).symbol(), " ");
                assert_eq!(cell(&buf, x, y).bg, Color::Rgb(20, 20, 20));
            }
        }
    }

    #[test]
    fn test_spectrum_full_bar_fills_column() {
        let area = Rect::new(0, 0, 128, 3);
        let mut buf = Buffer::empty(area);
        let mut mags = [0u8; FREQUENCY_BIN_COUNT];
        mags[0] = 255;
        Spectrum::new(&mags).render(area, &mut buf);

        // First bar is two columns wide and full height, in red
        for y in 0..3 {
            assert_eq!(cell(&buf, 0, y).symbol(), "█");
            assert_eq!(cell(&buf, 1, y).symbol(), "█");
            assert_eq!(cell(&buf, 0, y).fg, Color::Rgb(255, 0, 0));
        }
        assert_eq!(cell(&buf, 2, 2).symbol(), " ");
    }

    #[test]
    fn test_spectrum_partial_cell() {
        let area = Rect::new(0, 0, 128, 2);
        let mut buf = Buffer::empty(area);
        let mut mags = [0u8; FREQUENCY_BIN_COUNT];
        // 128 * 16 / 255 = 8 eighths: one full bottom cell
        mags[0] = 128;
        // 64 * 16 / 255 = 4 eighths: a half cell
        mags[1] = 64;
        Spectrum::new(&mags).render(area, &mut buf);

        assert_eq!(cell(&buf, 0, 1).symbol(), "█");
        assert_eq!(cell(&buf, 0, 0).symbol(), " ");
        assert_eq!(cell(&buf, 3, 1).symbol(), "▄");
    }
}
