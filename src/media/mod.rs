//! Media data structures for the playlist.
//!
//! This module provides the core types for representing media items, the
//! playlist state machine that owns the playback cursor, and the archive
//! exporter that bundles a playlist into a single zip file.

mod archive;
mod item;
mod playlist;

pub use archive::{export_playlist, ExportError, ExportSummary, Manifest, ManifestItem};
pub use item::{MediaError, MediaId, MediaItem, MediaKind, Original};
pub use playlist::{PlayRequest, Playlist, PlaylistError, PlaylistState};

/// Default playlist name written to exported manifests.
pub const DEFAULT_PLAYLIST_NAME: &str = "My Playlist";

/// File name of the exported archive.
pub const ARCHIVE_FILE_NAME: &str = "playlist.zip";

/// File extensions recognized as audio.
pub const AUDIO_EXTENSIONS: [&str; 9] = [
    "mp3", "wav", "flac", "ogg", "oga", "m4a", "aac", "opus", "aiff",
];

/// File extensions recognized as video.
pub const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "m4v", "mov", "mkv", "webm", "avi", "ogv"];

/// Returns true if the extension belongs to a playable audio or video file.
pub fn is_media_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Formats a position in seconds as `m:ss`.
///
/// Minutes are not padded; seconds always take two digits. Negative or
/// non-finite input (an unknown duration) renders as `0:00`.
///
/// # Examples
///
/// ```
/// use mediatui::media::format_time;
///
/// assert_eq!(format_time(75.4), "1:15");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
