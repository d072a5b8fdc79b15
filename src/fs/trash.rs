//! Trash / recycle bin
//!
//! Removing a file without the permanent-delete setting must leave it
//! recoverable: gone from its original path and present in some trash
//! facility.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::operations::FileOpError;

pub trait Trash {
    /// Move `path` out of the way, recoverably.
    fn trash(&self, path: &Path) -> Result<(), FileOpError>;
}

/// The platform recycle bin, with an optional directory fallback for
/// platforms or volumes where it is unavailable.
#[derive(Debug, Default, Clone)]
pub struct SystemTrash {
    fallback: Option<DirectoryTrash>,
}

impl SystemTrash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: DirectoryTrash) -> Self {
        Self {
            fallback: Some(fallback),
        }
    }
}

impl Trash for SystemTrash {
    fn trash(&self, path: &Path) -> Result<(), FileOpError> {
        match trash::delete(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Moved to system trash");
                Ok(())
            }
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "System trash unavailable, using fallback trash folder"
                    );
                    fallback.trash(path)
                }
                None => Err(FileOpError::Trash {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                }),
            },
        }
    }
}

/// Moves files into a plain directory.
#[derive(Debug, Clone)]
pub struct DirectoryTrash {
    dir: PathBuf,
}

impl DirectoryTrash {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// ~/.local/share/media-viewer/trash on Linux
    pub fn default_location() -> Self {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir);
        path.push("media-viewer");
        path.push("trash");
        Self::new(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A free name inside the trash: `name`, then `name (1)`, `name (2)`...
    fn free_target(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }

        let original = Path::new(file_name);
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        (1..)
            .map(|n| self.dir.join(format!("{stem} ({n}){extension}")))
            .find(|candidate| !candidate.exists())
            .unwrap_or(candidate)
    }
}

impl Trash for DirectoryTrash {
    fn trash(&self, path: &Path) -> Result<(), FileOpError> {
        if !path.exists() {
            return Err(FileOpError::Missing(path.to_path_buf()));
        }

        fs::create_dir_all(&self.dir).map_err(|source| FileOpError::Io {
            operation: "create trash folder",
            path: self.dir.clone(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let target = self.free_target(&file_name);

        super::operations::move_path(path, &target)?;
        debug!(path = %path.display(), target = %target.display(), "Moved to trash folder");
        Ok(())
    }
}
