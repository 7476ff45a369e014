//! Media item representation.
//!
//! A media item is one playable file in the playlist: its identity, display
//! name, kind, the path used for playback, and an optional handle to the
//! original bytes that are bundled on export.

use super::{AUDIO_EXTENSIONS, VIDEO_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when creating a media item.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The path does not point at a readable file.
    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file extension is not a known audio or video type.
    #[error("unsupported media type: {}", .0.display())]
    UnsupportedType(PathBuf),
}

/// Opaque unique identifier for a media item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether an item is played as audio or as video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Detects the kind from a file extension.
    ///
    /// Returns None for extensions that are neither audio nor video.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    /// Glyph shown next to the item in the playlist.
    pub fn glyph(&self) -> &'static str {
        match self {
            MediaKind::Audio => "♪",
            MediaKind::Video => "▶",
        }
    }

    /// Lowercase name, as written in the manifest.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Handle to the raw bytes of an item, kept for export.
#[derive(Debug, Clone)]
pub enum Original {
    /// Bytes live in a local file and are read when needed.
    File(PathBuf),
    /// Bytes are already held in memory.
    Bytes(Arc<[u8]>),
}

impl Original {
    /// Reads the original bytes.
    pub fn read(&self) -> io::Result<Cow<'_, [u8]>> {
        match self {
            Original::File(path) => fs::read(path).map(Cow::Owned),
            Original::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// A single entry in the playlist.
///
/// Items are immutable once created.
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Unique identifier.
    pub id: MediaId,
    /// Display name (the file name).
    pub name: String,
    /// Audio or video.
    pub kind: MediaKind,
    /// Path used to open the item for playback.
    pub source: PathBuf,
    /// Raw bytes for export, if still available.
    pub original: Option<Original>,
}

impl MediaItem {
    /// Creates an item from explicit parts.
    pub fn new(
        name: impl Into<String>,
        kind: MediaKind,
        source: impl Into<PathBuf>,
        original: Option<Original>,
    ) -> Self {
        Self {
            id: MediaId::new(),
            name: name.into(),
            kind,
            source: source.into(),
            original,
        }
    }

    /// Creates an item for a local file.
    ///
    /// The kind is taken from the extension and the file itself is kept as
    /// the original for export.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or its extension is not a
    /// known media type.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|source| MediaError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(MediaError::Unreadable {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let kind =
            MediaKind::from_path(path).ok_or_else(|| MediaError::UnsupportedType(path.into()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(
            name,
            kind,
            path,
            Some(Original::File(path.to_path_buf())),
        ))
    }

    /// Returns true if this item can show the spectrum visualizer.
    pub fn is_audio(&self) -> bool {
        self.kind == MediaKind::Audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection() {
        assert_eq!(
            MediaKind::from_path(Path::new("song.MP3")),
            Some(MediaKind::Audio)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("clip.webm")),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = MediaItem::new("a.mp3", MediaKind::Audio, "a.mp3", None);
        let b = MediaItem::new("a.mp3", MediaKind::Audio, "a.mp3", None);
        assert_ne!(a.id, b.id);
        assert!(!a.id.as_str().is_empty());
    }

    #[test]
    fn test_from_path_rejects_missing_and_unknown() {
        let missing = MediaItem::from_path("/definitely/not/here.mp3");
        assert!(matches!(missing, Err(MediaError::Unreadable { .. })));

        let dir = std::env::temp_dir().join(format!("mediatui-item-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let text = dir.join("readme.txt");
        fs::write(&text, b"hello").unwrap();
        assert!(matches!(
            MediaItem::from_path(&text),
            Err(MediaError::UnsupportedType(_))
        ));

        let song = dir.join("track.flac");
        fs::write(&song, b"fLaC").unwrap();
        let item = MediaItem::from_path(&song).unwrap();
        assert_eq!(item.name, "track.flac");
        assert_eq!(item.kind, MediaKind::Audio);
        let bytes = item.original.as_ref().unwrap().read().unwrap();
        assert_eq!(&bytes[..], b"fLaC");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MediaKind::Video).unwrap(),
            "\"video\""
        );
    }
}
