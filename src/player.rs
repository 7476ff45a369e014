//! Player coordination.
//!
//! Ties the playlist, transport, and visualizer together. The player is the
//! only place that switches the active element, so it owns the teardown
//! order: stop the old spectrum loop and close its graph, release the old
//! element's listeners, then bind the new element and start a new loop.

use crate::audio::{
    ElementError, ElementFactory, FrameScheduler, Transport, TransportSignal, TransportState,
    Visualizer,
};
use crate::media::{MediaItem, PlayRequest, Playlist, PlaylistError};
use thiserror::Error;

/// Volume change per step of the volume control.
pub const VOLUME_STEP: f32 = 0.1;

/// Errors from player operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Invalid playlist navigation.
    #[error(transparent)]
    Playlist(#[from] PlaylistError),
    /// The item could not be opened for playback.
    #[error(transparent)]
    Element(#[from] ElementError),
}

/// Media player: playlist, transport, and visualizer for one session.
pub struct Player {
    playlist: Playlist,
    transport: Transport,
    visualizer: Visualizer,
    frames: FrameScheduler,
    backend: Box<dyn ElementFactory>,
}

impl Player {
    /// Creates an idle player with an empty playlist.
    ///
    /// # Arguments
    ///
    /// * `name` - Playlist name used on export
    /// * `backend` - Opens elements for playlist items
    pub fn new(name: impl Into<String>, backend: Box<dyn ElementFactory>) -> Self {
        Self {
            playlist: Playlist::new(name),
            transport: Transport::new(),
            visualizer: Visualizer::new(),
            frames: FrameScheduler::new(),
            backend,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn transport(&self) -> &TransportState {
        self.transport.state()
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    /// Returns true if an element is bound to the current item.
    pub fn is_active(&self) -> bool {
        self.transport.is_bound()
    }

    /// Adds items to the end of the playlist.
    ///
    /// When the playlist was empty, the first item is opened but not played.
    ///
    /// # Errors
    ///
    /// Returns error if the first item of a previously empty playlist cannot
    /// be opened. The items are added regardless.
    pub fn add_items(&mut self, items: Vec<MediaItem>) -> Result<usize, PlayerError> {
        let count = items.len();
        for item in &items {
            tracing::info!("Added {:?} ({})", item.name, item.kind.as_str());
        }
        if self.playlist.append(items) {
            self.activate(PlayRequest { index: 0 }, false)?;
        }
        Ok(count)
    }

    /// Selects the item at `index` and starts it.
    ///
    /// # Errors
    ///
    /// Returns error if the index is out of range or the item cannot be opened.
    pub fn select_index(&mut self, index: usize) -> Result<(), PlayerError> {
        let request = self.playlist.select_index(index)?;
        self.activate(request, true)
    }

    /// Moves to and starts the next item. No-op at the end.
    ///
    /// # Returns
    ///
    /// true if the cursor moved
    pub fn next(&mut self) -> Result<bool, PlayerError> {
        match self.playlist.advance() {
            Some(request) => self.activate(request, true).map(|_| true),
            None => Ok(false),
        }
    }

    /// Moves to and starts the previous item. No-op at the start.
    ///
    /// # Returns
    ///
    /// true if the cursor moved
    pub fn previous(&mut self) -> Result<bool, PlayerError> {
        match self.playlist.retreat() {
            Some(request) => self.activate(request, true).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn toggle_play_pause(&mut self) {
        self.transport.toggle_play_pause();
    }

    pub fn seek(&mut self, seconds: f64) {
        self.transport.seek(seconds);
    }

    /// Seeks relative to the current position.
    pub fn seek_by(&mut self, delta: f64) {
        let target = self.transport.state().current_time + delta;
        self.transport.seek(target);
    }

    /// Seeks to a fraction (0..=1) of the known duration.
    pub fn seek_fraction(&mut self, fraction: f64) {
        let duration = self.transport.state().duration;
        if duration > 0.0 {
            self.transport.seek(fraction.clamp(0.0, 1.0) * duration);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.transport.set_volume(volume);
    }

    /// Changes the volume by `steps` increments of 0.1.
    pub fn adjust_volume(&mut self, steps: i32) {
        let current = (self.transport.state().volume / VOLUME_STEP).round() as i32;
        let target = (current + steps).clamp(0, 10) as f32 * VOLUME_STEP;
        self.transport.set_volume((target * 10.0).round() / 10.0);
    }

    pub fn toggle_mute(&mut self) {
        self.transport.toggle_mute();
    }

    /// Runs one UI tick.
    ///
    /// Mirrors element events onto the transport, advances the playlist when
    /// the current item ends, and runs due visualizer frames.
    ///
    /// # Errors
    ///
    /// Returns error if the next item after an ended one cannot be opened.
    pub fn tick(&mut self) -> Result<(), PlayerError> {
        self.transport.poll();
        for signal in self.transport.drain_events() {
            match signal {
                TransportSignal::Ended => {
                    if let Some(request) = self.playlist.advance() {
                        self.activate(request, true)?;
                    }
                }
            }
        }

        let due = self.frames.take_due();
        self.visualizer.on_refresh(&due, &mut self.frames);
        Ok(())
    }

    /// Makes the item at `request.index` the active one.
    fn activate(&mut self, request: PlayRequest, autoplay: bool) -> Result<(), PlayerError> {
        self.visualizer.detach(&mut self.frames);
        self.transport.unbind();

        let Some(item) = self.playlist.get(request.index) else {
            return Ok(());
        };
        let element = match self.backend.open(item) {
            Ok(element) => element,
            Err(e) => {
                tracing::error!("Cannot open {:?}: {}", item.source, e);
                return Err(e.into());
            }
        };
        let audio = item.is_audio();

        let id = element.id();
        let tap = if audio { element.analysis_tap() } else { None };
        self.transport.bind(element);
        if let Some(tap) = tap {
            self.visualizer.attach(id, tap, &mut self.frames);
        }

        if autoplay {
            self.transport.play();
        }
        Ok(())
    }

    /// Number of outstanding visualizer frame requests.
    #[cfg(test)]
    fn pending_frames(&self) -> usize {
        self.frames.pending_count()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.visualizer.detach(&mut self.frames);
        self.transport.unbind();
    }
}
