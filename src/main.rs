//! mediatui - A terminal media player.
//!
//! This application plays a playlist of local audio and video files in the
//! terminal, drawing a live spectrum for audio and exporting the playlist as
//! a zip archive.
//!
//! # Features
//!
//! - Playlist with next/previous and click-to-play
//! - Play/pause, seek, volume, and mute controls
//! - Real-time spectrum visualizer using rustfft
//! - Export to `playlist.zip` with a JSON manifest and the media files
//!
//! # Usage
//!
//! ```bash
//! cargo run -- song.mp3 clip.mp4      # Start with files in the playlist
//! cargo run -- -o exports --name Mix  # Choose export folder and name
//! ```
//!
//! Press `?` for help with keyboard shortcuts.

mod app;
mod audio;
mod media;
mod player;
mod ui;

use app::{App, SEEK_STEP_SECS};
use audio::RodioBackend;
use media::{MediaItem, DEFAULT_PLAYLIST_NAME};
use player::Player;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    /// Files to load into the playlist at startup.
    files: Vec<PathBuf>,
    /// Directory the exported archive is written to.
    output_dir: PathBuf,
    /// Playlist name written to the manifest.
    name: String,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--output-dir <dir>` or `-o <dir>`: Where `playlist.zip` is written
    /// - `--name <name>`: Playlist name used in the export manifest
    /// - `--help` or `-h`: Print help and exit
    /// - Anything else not starting with `-` is a media file
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut files = Vec::new();
        let mut output_dir: Option<PathBuf> = None;
        let mut name = DEFAULT_PLAYLIST_NAME.to_string();
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--output-dir" | "-o" => {
                    i += 1;
                    if i >= args.len() {
                        eprintln!("Error: --output-dir requires a directory argument");
                        std::process::exit(1);
                    }
                    output_dir = Some(PathBuf::from(&args[i]));
                }
                "--name" => {
                    i += 1;
                    if i >= args.len() {
                        eprintln!("Error: --name requires a value");
                        std::process::exit(1);
                    }
                    name = args[i].clone();
                }
                "--help" | "-h" => {
                    eprintln!("mediatui - Terminal media player");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS] [FILES...]",
                        args.first().map(String::as_str).unwrap_or("mediatui")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -o, --output-dir DIR  Write playlist.zip to DIR (default: current directory)");
                    eprintln!("      --name NAME       Playlist name for export (default: {})", DEFAULT_PLAYLIST_NAME);
                    eprintln!("  -h, --help            Print this help message");
                    eprintln!();
                    eprintln!("Set RUST_LOG=debug to log to stderr.");
                    std::process::exit(0);
                }
                other if other.starts_with('-') && other.len() > 1 => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
                other => files.push(PathBuf::from(other)),
            }
            i += 1;
        }

        let output_dir = match output_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };

        Ok(Self {
            files,
            output_dir,
            name,
        })
    }
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;

    // Initialize logging (silent unless RUST_LOG is set)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load command-line files before taking over the terminal so that
    // problems can be reported plainly
    let mut items = Vec::new();
    for path in &cli.files {
        match MediaItem::from_path(path) {
            Ok(item) => items.push(item),
            Err(e) => eprintln!("Warning: skipping {}", e),
        }
    }

    let backend = RodioBackend::new().context("Failed to open audio output")?;
    let mut player = Player::new(cli.name, Box::new(backend));
    if !items.is_empty() {
        if let Err(e) = player.add_items(items) {
            eprintln!("Warning: {}", e);
        }
    }

    let mut app = App::new(player, cli.output_dir);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    // Handle any errors from the main loop
    result
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Mirror playback events, advance the playlist, and run due frames
        app.update();

        // Draw UI
        terminal.draw(|frame| {
            ui::render(frame, app);

            if app.show_help {
                ui::render_help(frame, app.help_scroll);
            }

            // Draw file browser if open
            ui::render_file_browser(frame, app);
        })?;

        // Handle events with a short timeout to keep the spectrum moving
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    if app.show_help {
                        handle_help_key(app, key.code);
                        continue;
                    }

                    // Handle file browser input
                    if app.file_browser.open {
                        match key.code {
                            KeyCode::Enter => {
                                app.file_browser_select();
                            }
                            KeyCode::Esc => {
                                app.file_browser_cancel();
                            }
                            KeyCode::Char(' ') => {
                                app.file_browser_toggle_mark();
                            }
                            KeyCode::Up | KeyCode::Char('k') => {
                                app.file_browser_up();
                            }
                            KeyCode::Down | KeyCode::Char('j') => {
                                app.file_browser_down();
                            }
                            _ => {}
                        }
                        continue;
                    }

                    if handle_key(app, key.code, key.modifiers) {
                        break;
                    }
                }
                Event::Mouse(mouse) => {
                    if app.show_help {
                        match mouse.kind {
                            // Click anywhere to close help
                            MouseEventKind::Down(MouseButton::Left) => {
                                app.show_help = false;
                                app.help_scroll = 0;
                            }
                            MouseEventKind::ScrollUp => {
                                app.help_scroll = app.help_scroll.saturating_sub(3);
                            }
                            MouseEventKind::ScrollDown => {
                                app.help_scroll = app.help_scroll.saturating_add(3);
                            }
                            _ => {}
                        }
                        continue;
                    }
                    if !app.file_browser.open {
                        handle_mouse(app, mouse);
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Handles keys while the help overlay is visible.
fn handle_help_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('?') | KeyCode::Esc => {
            app.show_help = false;
            app.help_scroll = 0; // Reset scroll on close
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.help_scroll = app.help_scroll.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.help_scroll = app.help_scroll.saturating_add(1);
        }
        KeyCode::Home => {
            app.help_scroll = 0;
        }
        _ => {}
    }
}

/// Handles mouse events.
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            app.handle_mouse_click(mouse.column, mouse.row);
        }
        MouseEventKind::ScrollUp => app.move_selection(-1),
        MouseEventKind::ScrollDown => app.move_selection(1),
        _ => {}
    }
}

/// Handles a key press event.
///
/// # Returns
///
/// `true` if the application should quit
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        // Quit
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') => return true,

        KeyCode::Char('?') => app.show_help = true,

        // Playback controls
        KeyCode::Char(' ') => app.player.toggle_play_pause(),
        KeyCode::Char('n') => app.next(),
        KeyCode::Char('p') => app.previous(),
        KeyCode::Left => app.player.seek_by(-SEEK_STEP_SECS),
        KeyCode::Right => app.player.seek_by(SEEK_STEP_SECS),
        KeyCode::Char('+') | KeyCode::Char('=') => app.player.adjust_volume(1),
        KeyCode::Char('-') => app.player.adjust_volume(-1),
        KeyCode::Char('m') => app.player.toggle_mute(),

        // Playlist
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Enter => app.play_selected_row(),

        KeyCode::Char('o') => app.open_file_browser(),
        KeyCode::Char('e') => {
            if app.player.playlist().is_empty() {
                app.set_status("Nothing to export");
            } else {
                app.set_status(format!("Exporting to {}...", app.archive_path().display()));
                app.start_export();
            }
        }
        _ => {}
    }
    false
}
