//! Playlist state machine.
//!
//! The playlist is an append-only, ordered list of media items plus a cursor
//! naming the active entry. Navigation never wraps: advancing past the last
//! item or retreating before the first is a no-op.

use super::item::MediaItem;
use super::DEFAULT_PLAYLIST_NAME;
use thiserror::Error;

/// Errors from playlist navigation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaylistError {
    /// The requested index is outside the playlist.
    #[error("index {index} is out of range for a playlist of {len} items")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Coarse playlist state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistState {
    /// No items; the player is idle.
    Empty,
    /// At least one item; `cursor` names the active one.
    Loaded { cursor: usize },
}

/// A request to start playback of the item at `index`.
///
/// Returned by the navigation operations that move the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PlayRequest {
    pub index: usize,
}

/// Ordered list of media items with a playback cursor.
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Playlist name, written to exported manifests.
    name: String,
    /// Items in insertion order.
    items: Vec<MediaItem>,
    /// Active index; always within bounds while `items` is non-empty.
    cursor: usize,
}

impl Playlist {
    /// Creates an empty playlist.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            cursor: 0,
        }
    }

    /// Returns the playlist name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current state.
    pub fn state(&self) -> PlaylistState {
        if self.items.is_empty() {
            PlaylistState::Empty
        } else {
            PlaylistState::Loaded {
                cursor: self.cursor,
            }
        }
    }

    /// Appends items to the end of the playlist.
    ///
    /// The cursor is left where it is, or set to 0 when the playlist was
    /// empty. Playback is not requested.
    ///
    /// # Returns
    ///
    /// true if the playlist went from empty to loaded
    pub fn append(&mut self, items: impl IntoIterator<Item = MediaItem>) -> bool {
        let was_empty = self.items.is_empty();
        self.items.extend(items);
        if was_empty && !self.items.is_empty() {
            self.cursor = 0;
            true
        } else {
            false
        }
    }

    /// Moves the cursor to `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index` is not a valid position.
    pub fn select_index(&mut self, index: usize) -> Result<PlayRequest, PlaylistError> {
        if index >= self.items.len() {
            return Err(PlaylistError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.cursor = index;
        Ok(PlayRequest { index })
    }

    /// Moves to the next item, if there is one.
    pub fn advance(&mut self) -> Option<PlayRequest> {
        if self.has_next() {
            self.cursor += 1;
            Some(PlayRequest { index: self.cursor })
        } else {
            None
        }
    }

    /// Moves to the previous item, if there is one.
    pub fn retreat(&mut self) -> Option<PlayRequest> {
        if self.has_previous() {
            self.cursor -= 1;
            Some(PlayRequest { index: self.cursor })
        } else {
            None
        }
    }

    /// Returns true if `advance` would move the cursor.
    pub fn has_next(&self) -> bool {
        !self.items.is_empty() && self.cursor < self.items.len() - 1
    }

    /// Returns true if `retreat` would move the cursor.
    pub fn has_previous(&self) -> bool {
        !self.items.is_empty() && self.cursor > 0
    }

    /// Returns the cursor, or None when empty.
    pub fn cursor(&self) -> Option<usize> {
        match self.state() {
            PlaylistState::Empty => None,
            PlaylistState::Loaded { cursor } => Some(cursor),
        }
    }

    /// Returns the item under the cursor.
    pub fn current(&self) -> Option<&MediaItem> {
        self.cursor().and_then(|i| self.items.get(i))
    }

    /// Returns the item at `index`.
    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    /// Returns all items in order.
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYLIST_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    fn items(names: &[&str]) -> Vec<MediaItem> {
        names
            .iter()
            .map(|n| MediaItem::new(*n, MediaKind::Audio, *n, None))
            .collect()
    }

    #[test]
    fn test_empty_playlist() {
        let playlist = Playlist::default();
        assert_eq!(playlist.state(), PlaylistState::Empty);
        assert_eq!(playlist.cursor(), None);
        assert!(playlist.current().is_none());
        assert!(!playlist.has_next());
        assert!(!playlist.has_previous());
        assert_eq!(playlist.name(), "My Playlist");
    }

    #[test]
    fn test_append_to_empty_selects_first() {
        let mut playlist = Playlist::default();
        assert!(playlist.append(items(&["a.mp3", "b.mp3"])));
        assert_eq!(playlist.state(), PlaylistState::Loaded { cursor: 0 });
        assert_eq!(playlist.current().unwrap().name, "a.mp3");
    }

    #[test]
    fn test_append_preserves_cursor() {
        let mut playlist = Playlist::default();
        playlist.append(items(&["a.mp3", "b.mp3"]));
        let _ = playlist.select_index(1).unwrap();

        assert!(!playlist.append(items(&["c.mp3"])));
        assert_eq!(playlist.cursor(), Some(1));
        assert_eq!(playlist.len(), 3);
        let names: Vec<_> = playlist.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a.mp3", "b.mp3", "c.mp3"]);
    }

    #[test]
    fn test_append_nothing_to_empty() {
        let mut playlist = Playlist::default();
        assert!(!playlist.append(Vec::new()));
        assert_eq!(playlist.state(), PlaylistState::Empty);
    }

    #[test]
    fn test_select_index_bounds() {
        let mut playlist = Playlist::default();
        assert_eq!(
            playlist.select_index(0),
            Err(PlaylistError::IndexOutOfRange { index: 0, len: 0 })
        );

        playlist.append(items(&["a.mp3", "b.mp3"]));
        assert_eq!(playlist.select_index(1), Ok(PlayRequest { index: 1 }));
        assert_eq!(
            playlist.select_index(2),
            Err(PlaylistError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(playlist.cursor(), Some(1));
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut playlist = Playlist::default();
        playlist.append(items(&["a.mp3", "b.mp3", "c.mp3"]));

        assert_eq!(playlist.advance(), Some(PlayRequest { index: 1 }));
        assert_eq!(playlist.advance(), Some(PlayRequest { index: 2 }));
        assert_eq!(playlist.advance(), None);
        assert_eq!(playlist.cursor(), Some(2));
    }

    #[test]
    fn test_retreat_stops_at_start() {
        let mut playlist = Playlist::default();
        playlist.append(items(&["a.mp3", "b.mp3"]));

        assert_eq!(playlist.retreat(), None);
        assert_eq!(playlist.cursor(), Some(0));

        let _ = playlist.select_index(1).unwrap();
        assert_eq!(playlist.retreat(), Some(PlayRequest { index: 0 }));
        assert_eq!(playlist.retreat(), None);
    }

    #[test]
    fn test_cursor_always_in_bounds() {
        let mut playlist = Playlist::default();
        playlist.append(items(&["a", "b", "c", "d"]));
        // Walk a mixed sequence of operations and check the invariant each step
        for step in 0..40 {
            match step % 5 {
                0 | 1 => {
                    let _ = playlist.advance();
                }
                2 => {
                    let _ = playlist.retreat();
                }
                3 => {
                    let _ = playlist.select_index(step % 7);
                }
                _ => {
                    playlist.append(items(&["x"]));
                }
            }
            let cursor = playlist.cursor().unwrap();
            assert!(cursor < playlist.len());
        }
    }
}
