//! Playlist archive export.
//!
//! Bundles a playlist into a single zip file containing a `playlist.json`
//! manifest at the root and the original bytes of each item under `media/`.
//!
//! # Limitations
//!
//! - Items without original bytes are listed in the manifest but have no
//!   `media/` entry
//! - Two items with the same name share one `media/` entry; the later item wins

use super::item::{MediaItem, MediaKind};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the manifest entry inside the archive.
pub const MANIFEST_ENTRY: &str = "playlist.json";

/// Directory prefix for media entries inside the archive.
pub const MEDIA_DIR: &str = "media/";

/// Errors that can occur while assembling an archive.
#[derive(Debug, Error)]
pub enum ExportError {
    /// There is nothing to export.
    #[error("playlist is empty")]
    EmptyPlaylist,
    /// The original bytes of an item could not be read.
    #[error("failed to read original bytes of {name}: {source}")]
    ReadOriginal {
        name: String,
        #[source]
        source: io::Error,
    },
    /// Writing the archive file failed.
    #[error("failed to write archive: {0}")]
    Io(#[from] io::Error),
    /// The zip encoder reported an error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// The manifest could not be serialized.
    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// One entry of the manifest's item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// The `playlist.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Playlist name.
    pub name: String,
    /// Creation time, ISO-8601 UTC with milliseconds.
    pub created: String,
    /// Items in playlist order.
    pub items: Vec<ManifestItem>,
}

impl Manifest {
    /// Builds a manifest for the given items, stamped with the current time.
    pub fn new(name: impl Into<String>, items: &[MediaItem]) -> Self {
        Self {
            name: name.into(),
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            items: items
                .iter()
                .map(|item| ManifestItem {
                    id: item.id.to_string(),
                    name: item.name.clone(),
                    kind: item.kind,
                })
                .collect(),
        }
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Path of the written archive.
    pub path: PathBuf,
    /// Number of items listed in the manifest.
    pub listed: usize,
    /// Number of `media/` entries written.
    pub archived: usize,
    /// Names of items listed without bytes.
    pub omitted: Vec<String>,
}

/// Exports a playlist snapshot to a zip archive.
///
/// The archive is written to a temporary sibling file first and renamed into
/// place, so a failed export never leaves a truncated `output_path` behind.
///
/// # Arguments
///
/// * `playlist_name` - Name recorded in the manifest
/// * `items` - Playlist items in order
/// * `output_path` - Path of the archive to create
///
/// # Errors
///
/// Returns error if:
/// - The playlist is empty
/// - An item's original file can no longer be read
/// - The archive cannot be written
pub fn export_playlist<P: AsRef<Path>>(
    playlist_name: &str,
    items: &[MediaItem],
    output_path: P,
) -> Result<ExportSummary, ExportError> {
    if items.is_empty() {
        return Err(ExportError::EmptyPlaylist);
    }

    let output_path = output_path.as_ref();
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let partial_path = output_path.with_extension("zip.part");
    let result = write_archive(playlist_name, items, &partial_path);
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            let _ = fs::remove_file(&partial_path);
            return Err(e);
        }
    };
    fs::rename(&partial_path, output_path)?;

    tracing::info!(
        "Exported {} items ({} with media) to {:?}",
        summary.listed,
        summary.archived,
        output_path
    );

    Ok(ExportSummary {
        path: output_path.to_path_buf(),
        ..summary
    })
}

/// Writes the manifest and media entries to `path`.
fn write_archive(
    playlist_name: &str,
    items: &[MediaItem],
    path: &Path,
) -> Result<ExportSummary, ExportError> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = Manifest::new(playlist_name, items);
    zip.start_file(MANIFEST_ENTRY, options)?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

    // Last item with a given name owns that media entry
    let mut owner: HashMap<&str, usize> = HashMap::new();
    let mut omitted = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if item.original.is_none() {
            tracing::warn!("No original bytes for {:?}; listed without media", item.name);
            omitted.push(item.name.clone());
            continue;
        }
        if owner.insert(item.name.as_str(), index).is_some() {
            tracing::warn!("Duplicate media name {:?}; later item replaces earlier", item.name);
        }
    }

    let mut archived = 0;
    for (index, item) in items.iter().enumerate() {
        if owner.get(item.name.as_str()) != Some(&index) {
            continue;
        }
        let Some(original) = &item.original else {
            continue;
        };
        let bytes = original.read().map_err(|source| ExportError::ReadOriginal {
            name: item.name.clone(),
            source,
        })?;
        zip.start_file(format!("{}{}", MEDIA_DIR, item.name), options)?;
        zip.write_all(&bytes)?;
        archived += 1;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        listed: items.len(),
        archived,
        omitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Original;
    use std::io::Read;
    use std::sync::Arc;
    use zip::ZipArchive;

    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mediatui-export-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn item_with_bytes(name: &str, kind: MediaKind, bytes: &[u8]) -> MediaItem {
        MediaItem::new(
            name,
            kind,
            name,
            Some(Original::Bytes(Arc::from(bytes.to_vec()))),
        )
    }

    fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
        let mut entry = archive.by_name(name).unwrap();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_export_two_items() {
        let dir = test_dir();
        let output = dir.join("playlist.zip");
        let items = vec![
            item_with_bytes("a.mp3", MediaKind::Audio, b"audio-bytes"),
            item_with_bytes("b.mp4", MediaKind::Video, b"video-bytes"),
        ];

        let summary = export_playlist("My Playlist", &items, &output).unwrap();
        assert_eq!(summary.listed, 2);
        assert_eq!(summary.archived, 2);
        assert!(summary.omitted.is_empty());
        assert!(!dir.join("playlist.zip.part").exists());

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);

        let manifest: Manifest =
            serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)).unwrap();
        assert_eq!(manifest.name, "My Playlist");
        let names: Vec<_> = manifest.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a.mp3", "b.mp4"]);
        assert_eq!(manifest.items[0].id, items[0].id.to_string());
        assert_eq!(manifest.items[1].kind, MediaKind::Video);

        assert_eq!(read_entry(&mut archive, "media/a.mp3"), b"audio-bytes");
        assert_eq!(read_entry(&mut archive, "media/b.mp4"), b"video-bytes");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_manifest_format() {
        let items = vec![item_with_bytes("a.mp3", MediaKind::Audio, b"x")];
        let manifest = Manifest::new("Mix", &items);

        // Millisecond ISO-8601 in UTC, e.g. 2024-05-01T12:00:00.000Z
        assert_eq!(manifest.created.len(), 24);
        assert!(manifest.created.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&manifest.created).is_ok());

        let json = serde_json::to_string_pretty(&manifest).unwrap();
        assert!(json.contains("\n  \"name\": \"Mix\""));
        assert!(json.contains("\"type\": \"audio\""));
    }

    #[test]
    fn test_items_without_bytes_are_listed_only() {
        let dir = test_dir();
        let output = dir.join("playlist.zip");
        let items = vec![
            item_with_bytes("a.mp3", MediaKind::Audio, b"a"),
            MediaItem::new("remote.mp3", MediaKind::Audio, "remote.mp3", None),
        ];

        let summary = export_playlist("My Playlist", &items, &output).unwrap();
        assert_eq!(summary.archived, 1);
        assert_eq!(summary.omitted, vec!["remote.mp3".to_string()]);

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let manifest: Manifest =
            serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)).unwrap();
        assert_eq!(manifest.items.len(), 2);
        assert!(archive.by_name("media/remote.mp3").is_err());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let dir = test_dir();
        let output = dir.join("playlist.zip");
        let items = vec![
            item_with_bytes("same.mp3", MediaKind::Audio, b"first"),
            item_with_bytes("same.mp3", MediaKind::Audio, b"second"),
        ];

        let summary = export_playlist("My Playlist", &items, &output).unwrap();
        assert_eq!(summary.listed, 2);
        assert_eq!(summary.archived, 1);

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(read_entry(&mut archive, "media/same.mp3"), b"second");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_playlist_is_rejected() {
        let dir = test_dir();
        let output = dir.join("playlist.zip");
        assert!(matches!(
            export_playlist("My Playlist", &[], &output),
            Err(ExportError::EmptyPlaylist)
        ));
        assert!(!output.exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unreadable_original_fails_cleanly() {
        let dir = test_dir();
        let output = dir.join("playlist.zip");
        let items = vec![MediaItem::new(
            "gone.mp3",
            MediaKind::Audio,
            "gone.mp3",
            Some(Original::File(dir.join("gone.mp3"))),
        )];

        let result = export_playlist("My Playlist", &items, &output);
        assert!(matches!(result, Err(ExportError::ReadOriginal { .. })));
        assert!(!output.exists());
        assert!(!dir.join("playlist.zip.part").exists());

        fs::remove_dir_all(&dir).ok();
    }
}
