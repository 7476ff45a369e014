//! Application state and event handling.
//!
//! This module defines the main application state that coordinates
//! between the player, the export job, and the TUI interface.

use crate::media::{
    export_playlist, is_media_extension, ExportError, ExportSummary, MediaItem,
    ARCHIVE_FILE_NAME,
};
use crate::player::{Player, PlayerError};
use ratatui::layout::Rect;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// How long a status message stays visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Seek step for the arrow keys, in seconds.
pub const SEEK_STEP_SECS: f64 = 5.0;

/// Number of file browser rows visible at once.
const BROWSER_VISIBLE_ROWS: usize = 10;

/// State for the file browser dialog.
#[derive(Debug, Clone)]
pub struct FileBrowserState {
    /// Whether the browser is open.
    pub open: bool,
    /// Current directory path.
    pub current_dir: PathBuf,
    /// List of entries in current directory.
    pub entries: Vec<PathBuf>,
    /// Files marked for adding.
    pub marked: BTreeSet<PathBuf>,
    /// Currently selected index.
    pub selected: usize,
    /// Scroll offset for long lists.
    pub scroll: usize,
}

impl Default for FileBrowserState {
    fn default() -> Self {
        Self {
            open: false,
            current_dir: std::env::current_dir().unwrap_or_default(),
            entries: Vec::new(),
            marked: BTreeSet::new(),
            selected: 0,
            scroll: 0,
        }
    }
}

/// Layout regions for mouse hit testing.
/// Stores the screen coordinates of each UI panel.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegions {
    /// The stage showing the spectrum or video placeholder.
    pub stage: Rect,
    /// The transport bar.
    pub transport: Rect,
    /// The seek gauge inside the transport bar.
    pub seek_bar: Rect,
    /// The playlist panel, including its border.
    pub playlist: Rect,
    /// The playlist rows (inside the border).
    pub playlist_rows: Rect,
}

impl LayoutRegions {
    fn contains(&self, rect: Rect, x: u16, y: u16) -> bool {
        x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
    }

    /// Returns the fraction of the seek bar at column `x`, if the point is on it.
    pub fn seek_fraction_at(&self, x: u16, y: u16) -> Option<f64> {
        if !self.contains(self.seek_bar, x, y) || self.seek_bar.width == 0 {
            return None;
        }
        let offset = f64::from(x - self.seek_bar.x);
        Some((offset / f64::from(self.seek_bar.width.saturating_sub(1).max(1))).clamp(0.0, 1.0))
    }

    /// Returns the visible playlist row at the given point.
    pub fn playlist_row_at(&self, x: u16, y: u16) -> Option<usize> {
        self.contains(self.playlist_rows, x, y)
            .then(|| usize::from(y - self.playlist_rows.y))
    }
}

/// Background export of the playlist archive.
struct ExportJob {
    result: Receiver<Result<ExportSummary, ExportError>>,
}

/// Main application state.
pub struct App {
    /// The media player.
    pub player: Player,
    /// Status message to display.
    pub status_message: Option<(String, Instant)>,
    /// File browser state for adding media.
    pub file_browser: FileBrowserState,
    /// Whether the help overlay is visible.
    pub show_help: bool,
    /// Help menu scroll offset.
    pub help_scroll: u16,
    /// Highlighted playlist row (keyboard selection).
    pub selected_row: usize,
    /// Scroll offset of the playlist panel.
    pub playlist_scroll: usize,
    /// Whether an export is running.
    pub exporting: bool,
    export_job: Option<ExportJob>,
    /// Playlist cursor as of the last highlight sync.
    seen_cursor: Option<usize>,
    /// Directory the archive is written to.
    pub output_dir: PathBuf,
    /// Layout regions for mouse hit testing (updated each frame).
    pub layout: LayoutRegions,
}

impl App {
    /// Creates a new application around a player.
    ///
    /// # Arguments
    ///
    /// * `player` - The player, possibly with items already added
    /// * `output_dir` - Directory the exported archive is written to
    pub fn new(player: Player, output_dir: PathBuf) -> Self {
        Self {
            player,
            status_message: None,
            file_browser: FileBrowserState::default(),
            show_help: false,
            help_scroll: 0,
            selected_row: 0,
            playlist_scroll: 0,
            exporting: false,
            export_job: None,
            seen_cursor: None,
            output_dir,
            layout: LayoutRegions::default(),
        }
    }

    /// Updates the layout regions (called after rendering).
    pub fn update_layout(&mut self, layout: LayoutRegions) {
        self.layout = layout;
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Advances playback and background work by one frame.
    pub fn update(&mut self) {
        if let Err(e) = self.player.tick() {
            self.report_player_error(e);
        }
        self.sync_selected_row();
        self.poll_export();
        self.clear_expired_status();
    }

    // ==================== Playback ====================

    /// Loads files into the playlist.
    ///
    /// Files that cannot be read or have an unknown type are skipped and
    /// named in the status line.
    ///
    /// # Returns
    ///
    /// Number of items added
    pub fn add_paths(&mut self, paths: &[PathBuf]) -> usize {
        let mut items = Vec::new();
        let mut skipped = Vec::new();
        for path in paths {
            match MediaItem::from_path(path) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!("Skipping {}", e);
                    skipped.push(display_name(path));
                }
            }
        }

        let added = items.len();
        if added > 0 {
            if let Err(e) = self.player.add_items(items) {
                self.report_player_error(e);
            }
            self.sync_selected_row();
        }

        if !skipped.is_empty() {
            self.set_status(format!("Skipped: {}", skipped.join(", ")));
        } else if added > 0 {
            self.set_status(format!(
                "Added {} file{}",
                added,
                if added == 1 { "" } else { "s" }
            ));
        }
        added
    }

    /// Plays the highlighted playlist row.
    pub fn play_selected_row(&mut self) {
        self.select_item(self.selected_row);
    }

    /// Selects and plays the item at `index`.
    pub fn select_item(&mut self, index: usize) {
        if let Err(e) = self.player.select_index(index) {
            self.report_player_error(e);
        }
        self.sync_selected_row();
    }

    pub fn next(&mut self) {
        if let Err(e) = self.player.next() {
            self.report_player_error(e);
        }
        self.sync_selected_row();
    }

    pub fn previous(&mut self) {
        if let Err(e) = self.player.previous() {
            self.report_player_error(e);
        }
        self.sync_selected_row();
    }

    /// Moves the playlist highlight by `delta` rows.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.player.playlist().len();
        if len == 0 {
            return;
        }
        self.selected_row = self
            .selected_row
            .saturating_add_signed(delta)
            .min(len - 1);
    }

    /// Moves the highlight to the active item whenever the cursor moves.
    fn sync_selected_row(&mut self) {
        let cursor = self.player.playlist().cursor();
        if cursor != self.seen_cursor {
            self.seen_cursor = cursor;
            if let Some(cursor) = cursor {
                self.selected_row = cursor;
            }
        }
    }

    fn report_player_error(&mut self, error: PlayerError) {
        match error {
            PlayerError::Element(e) => {
                let name = self
                    .player
                    .playlist()
                    .current()
                    .map(|item| item.name.clone())
                    .unwrap_or_default();
                tracing::error!("Playback failed: {}", e);
                self.set_status(format!("Cannot play {}", name));
            }
            PlayerError::Playlist(e) => tracing::debug!("Ignoring selection: {}", e),
        }
    }

    // ==================== Mouse ====================

    /// Handles a left click.
    ///
    /// # Returns
    ///
    /// true if the click hit a control
    pub fn handle_mouse_click(&mut self, x: u16, y: u16) -> bool {
        if let Some(fraction) = self.layout.seek_fraction_at(x, y) {
            self.player.seek_fraction(fraction);
            return true;
        }
        if let Some(row) = self.layout.playlist_row_at(x, y) {
            let index = self.playlist_scroll + row;
            if index < self.player.playlist().len() {
                self.select_item(index);
                return true;
            }
        }
        false
    }

    // ==================== Export ====================

    /// Path of the archive written by `start_export`.
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(ARCHIVE_FILE_NAME)
    }

    /// Starts writing the playlist archive on a background thread.
    ///
    /// Does nothing while an export is already running.
    pub fn start_export(&mut self) {
        if self.exporting {
            return;
        }

        let name = self.player.playlist().name().to_string();
        let items = self.player.playlist().items().to_vec();
        let path = self.archive_path();
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("export".into())
            .spawn(move || {
                let result = export_playlist(&name, &items, &path);
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => {
                self.exporting = true;
                self.export_job = Some(ExportJob { result: rx });
            }
            Err(e) => tracing::error!("Export failed: {:?}", e),
        }
    }

    /// Collects the export result once the background thread finishes.
    pub fn poll_export(&mut self) {
        let Some(job) = &self.export_job else {
            return;
        };
        let outcome = match job.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => None,
        };

        self.export_job = None;
        self.exporting = false;
        match outcome {
            Some(Ok(summary)) => {
                self.set_status(format!("Exported to {}", summary.path.display()));
            }
            Some(Err(e)) => tracing::error!("Export failed: {:?}", e),
            None => tracing::error!("Export failed: worker exited without a result"),
        }
    }

    // ==================== File browser ====================

    /// Opens the file browser for adding media.
    pub fn open_file_browser(&mut self) {
        self.file_browser.open = true;
        self.file_browser.selected = 0;
        self.file_browser.scroll = 0;
        self.file_browser.marked.clear();
        self.refresh_file_browser();
    }

    /// Refreshes the file browser entries.
    fn refresh_file_browser(&mut self) {
        self.file_browser.entries = list_media_dir(&self.file_browser.current_dir);

        if self.file_browser.selected >= self.file_browser.entries.len() {
            self.file_browser.selected = 0;
        }
    }

    /// Moves selection up in the file browser.
    pub fn file_browser_up(&mut self) {
        if self.file_browser.open && self.file_browser.selected > 0 {
            self.file_browser.selected -= 1;
            if self.file_browser.selected < self.file_browser.scroll {
                self.file_browser.scroll = self.file_browser.selected;
            }
        }
    }

    /// Moves selection down in the file browser.
    pub fn file_browser_down(&mut self) {
        if self.file_browser.open
            && self.file_browser.selected + 1 < self.file_browser.entries.len()
        {
            self.file_browser.selected += 1;
            if self.file_browser.selected >= self.file_browser.scroll + BROWSER_VISIBLE_ROWS {
                self.file_browser.scroll = self
                    .file_browser
                    .selected
                    .saturating_sub(BROWSER_VISIBLE_ROWS - 1);
            }
        }
    }

    /// Marks or unmarks the highlighted file.
    pub fn file_browser_toggle_mark(&mut self) {
        let Some(path) = self.file_browser.entries.get(self.file_browser.selected) else {
            return;
        };
        if path.is_dir() || path == Path::new("..") {
            return;
        }
        let path = path.clone();
        if !self.file_browser.marked.remove(&path) {
            self.file_browser.marked.insert(path);
        }
        self.file_browser_down();
    }

    /// Enters the highlighted directory, or adds files to the playlist.
    ///
    /// Adds every marked file, or the highlighted file when none are marked.
    ///
    /// # Returns
    ///
    /// true if files were added and the browser closed
    pub fn file_browser_select(&mut self) -> bool {
        if !self.file_browser.open {
            return false;
        }

        if self.file_browser.marked.is_empty() {
            let Some(selected_path) = self.file_browser.entries.get(self.file_browser.selected)
            else {
                return false;
            };

            if selected_path == Path::new("..") {
                if let Some(parent) = self.file_browser.current_dir.parent() {
                    self.file_browser.current_dir = parent.to_path_buf();
                    self.enter_directory();
                }
                return false;
            } else if selected_path.is_dir() {
                self.file_browser.current_dir = selected_path.clone();
                self.enter_directory();
                return false;
            }
            let path = selected_path.clone();
            self.file_browser.marked.insert(path);
        }

        let paths: Vec<PathBuf> = std::mem::take(&mut self.file_browser.marked)
            .into_iter()
            .collect();
        self.file_browser.open = false;
        self.add_paths(&paths) > 0
    }

    fn enter_directory(&mut self) {
        self.file_browser.selected = 0;
        self.file_browser.scroll = 0;
        self.file_browser.marked.clear();
        self.refresh_file_browser();
    }

    /// Closes the file browser without adding anything.
    pub fn file_browser_cancel(&mut self) {
        self.file_browser.open = false;
        self.file_browser.marked.clear();
    }
}

/// Lists subdirectories and media files in `dir`, directories first.
fn list_media_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries = Vec::new();

    // Add parent directory entry if not at root
    if dir.parent().is_some() {
        entries.push(PathBuf::from(".."));
    }

    if let Ok(read) = std::fs::read_dir(dir) {
        let mut dirs: Vec<PathBuf> = Vec::new();
        let mut files: Vec<PathBuf> = Vec::new();

        for entry in read.flatten() {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(is_media_extension)
            {
                files.push(path);
            }
        }

        dirs.sort();
        files.sort();
        entries.extend(dirs);
        entries.extend(files);
    }
    entries
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
