//! mediatui - A terminal media player.
//!
//! This library provides the playlist, playback, visualizer, and export
//! functionality behind the mediatui app.

pub mod app;
pub mod audio;
pub mod media;
pub mod player;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use audio::{RodioBackend, Transport, TransportState, Visualizer};
pub use media::{export_playlist, MediaItem, MediaKind, Playlist};
pub use player::Player;
