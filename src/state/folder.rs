//! Folder templates produced by scanning the filesystem
//!
//! A `Folder` is a plain owned tree. The folder model deep-copies templates
//! into its own storage, so callers may keep or drop them freely.

use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::media::count_media;
use super::path_index::{display_name, normalize_path, paths_equal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    path: String,
    name: String,
    media_count: Option<usize>,
    children: Vec<Folder>,
}

impl Folder {
    /// A shallow folder with no children and no pre-computed media count.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = normalize_path(path.as_ref());
        Self {
            name: display_name(&path),
            path,
            media_count: None,
            children: Vec::new(),
        }
    }

    /// Scan `path` and its subfolders down to `depth` levels.
    ///
    /// Hidden folders are skipped, children are sorted by name and every
    /// scanned folder gets its media count pre-computed.
    pub fn scan(path: impl AsRef<Path>, depth: usize) -> Self {
        let path = path.as_ref();
        let mut folder = Self::new(path.to_string_lossy());
        folder.media_count = Some(count_media(path));

        if depth == 0 {
            return folder;
        }

        let mut subfolders: Vec<_> = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable folder entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .map(|entry| entry.into_path())
            .collect();
        subfolders.sort();

        for subfolder in subfolders {
            folder.push_child(Self::scan(&subfolder, depth - 1));
        }

        debug!(path = %folder.path, children = folder.children.len(), "Scanned folder");
        folder
    }

    /// Builder-style `push_child`.
    pub fn with_child(mut self, child: Folder) -> Self {
        self.push_child(child);
        self
    }

    /// Append a child unless one with the same path already exists.
    pub fn push_child(&mut self, child: Folder) -> bool {
        if self.children.iter().any(|c| paths_equal(&c.path, &child.path)) {
            return false;
        }
        self.children.push(child);
        true
    }

    pub fn with_media_count(mut self, count: usize) -> Self {
        self.media_count = Some(count);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_count(&self) -> Option<usize> {
        self.media_count
    }

    pub fn children(&self) -> &[Folder] {
        &self.children
    }
}
