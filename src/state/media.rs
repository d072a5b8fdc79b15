//! Media entries and the media-type predicate
//!
//! These structs represent the data that flows between the filesystem scan
//! and the list model.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Still image formats the `image` crate can decode
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff", "tga", "ico", "pnm", "qoi",
];

/// Supported RAW file extensions (common formats)
const RAW_EXTENSIONS: &[&str] = &[
    "nef", "dng", "cr2", "cr3", "arw", "raf", "orf", "rw2", "pef", "srw", "erf", "kdc", "dcr",
    "mos", "raw", "rwl",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "webm", "wmv", "mpg", "mpeg", "3gp",
];

/// Media classification.
///
/// The declaration order is the order used when sorting by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    RawImage,
    Video,
}

/// Classify a file by its extension (case-insensitive).
///
/// Returns `None` when the file is not a recognized media file.
pub fn classify(file_name: impl AsRef<Path>) -> Option<MediaKind> {
    let extension = file_name
        .as_ref()
        .extension()?
        .to_string_lossy()
        .to_lowercase();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Image)
    } else if RAW_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::RawImage)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

pub fn is_media(file_name: impl AsRef<Path>) -> bool {
    classify(file_name).is_some()
}

/// Represents a single media file in the current folder
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntry {
    /// Full path to the file
    pub path: PathBuf,
    /// Filename only (e.g., "DSC_0001.NEF")
    pub name: String,
    /// Last modification time
    pub modified: DateTime<Local>,
    /// Size in bytes
    pub size: u64,
    pub kind: MediaKind,
}

impl MediaEntry {
    /// Build an entry from a file on disk.
    ///
    /// Returns `None` when the file is not media or its metadata cannot be read.
    pub fn from_path(path: &Path) -> Option<Self> {
        let kind = classify(path)?;
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read media metadata");
                return None;
            }
        };

        let modified = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        Some(Self {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            modified,
            size: metadata.len(),
            kind,
        })
    }
}

/// Produces the media entries of one directory.
pub trait MediaScanner {
    /// List the media files directly inside `root` (non-recursive).
    fn scan(&self, root: &Path) -> Vec<MediaEntry>;
}

/// Scans the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryScanner;

impl MediaScanner for DirectoryScanner {
    fn scan(&self, root: &Path) -> Vec<MediaEntry> {
        let entries: Vec<MediaEntry> = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| MediaEntry::from_path(entry.path()))
            .collect();

        debug!(root = %root.display(), count = entries.len(), "Scanned media folder");
        entries
    }
}

/// Count the media files directly inside a folder.
pub fn count_media(folder: &Path) -> usize {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_media(entry.file_name()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_classify() {
        assert_eq!(classify("holiday.JPG"), Some(MediaKind::Image));
        assert_eq!(classify("DSC_0001.NEF"), Some(MediaKind::RawImage));
        assert_eq!(classify("clip.mp4"), Some(MediaKind::Video));
        assert_eq!(classify("notes.txt"), None);
        assert_eq!(classify("no_extension"), None);
    }

    #[test]
    fn test_kind_order() {
        assert!(MediaKind::Image < MediaKind::RawImage);
        assert!(MediaKind::RawImage < MediaKind::Video);
    }

    #[test]
    fn test_directory_scanner_is_flat_and_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"png").unwrap();
        fs::write(dir.path().join("b.mov"), b"movie").unwrap();
        fs::write(dir.path().join("readme.md"), b"text").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.jpg"), b"jpg").unwrap();

        let mut names: Vec<String> = DirectoryScanner
            .scan(dir.path())
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.png", "b.mov"]);
        assert_eq!(count_media(dir.path()), 2);
    }

    #[test]
    fn test_entry_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shot.cr2");
        fs::write(&path, vec![0u8; 42]).unwrap();

        let entry = MediaEntry::from_path(&path).unwrap();
        assert_eq!(entry.name, "shot.cr2");
        assert_eq!(entry.size, 42);
        assert_eq!(entry.kind, MediaKind::RawImage);
        assert!(MediaEntry::from_path(&dir.path().join("missing.jpg")).is_none());
    }
}
