//! Clipboard-style file operations
//!
//! Copy and cut only record a selection; `paste` performs the work. Every
//! file in a batch is attempted independently: failures are logged and
//! reported, never propagated.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::trash::{DirectoryTrash, SystemTrash, Trash};
use crate::settings::{keys, Settings};
use crate::state::signal::Signal;

#[derive(Debug, Error)]
pub enum FileOpError {
    #[error("source no longer exists: {0:?}")]
    Missing(PathBuf),

    #[error("destination already exists: {0:?}")]
    DestinationExists(PathBuf),

    #[error("not a regular file: {0:?}")]
    NotAFile(PathBuf),

    #[error("{operation} failed for {path:?}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {path:?} to trash: {reason}")]
    Trash { path: PathBuf, reason: String },
}

/// Outcome of a batch operation.
#[derive(Debug, Default)]
pub struct OperationReport {
    /// Paths that were created or removed, in processing order
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, FileOpError)>,
}

impl OperationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, operation: &str, path: &Path, result: Result<PathBuf, FileOpError>) {
        match result {
            Ok(done) => {
                debug!(operation, path = %path.display(), "File operation succeeded");
                self.succeeded.push(done);
            }
            Err(err) => {
                warn!(operation, path = %path.display(), error = %err, "File operation failed");
                self.failed.push((path.to_path_buf(), err));
            }
        }
    }
}

/// Copy a regular file into `destination_dir`, keeping its name.
///
/// Existing files are never overwritten.
pub fn copy_into(source: &Path, destination_dir: &Path) -> Result<PathBuf, FileOpError> {
    if !source.exists() {
        return Err(FileOpError::Missing(source.to_path_buf()));
    }
    if !source.is_file() {
        return Err(FileOpError::NotAFile(source.to_path_buf()));
    }

    let target = target_in(source, destination_dir);
    if target.exists() {
        return Err(FileOpError::DestinationExists(target));
    }

    fs::copy(source, &target).map_err(|err| FileOpError::Io {
        operation: "copy",
        path: source.to_path_buf(),
        source: err,
    })?;
    Ok(target)
}

/// Move `source` to `target`.
///
/// A rename is tried first; regular files that cannot be renamed (e.g.
/// across devices) are copied and then removed. If the source cannot be
/// removed the copy is deleted again, leaving the file only at `source`.
pub fn move_path(source: &Path, target: &Path) -> Result<(), FileOpError> {
    let rename_err = match fs::rename(source, target) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    if !source.is_file() {
        return Err(FileOpError::Io {
            operation: "move",
            path: source.to_path_buf(),
            source: rename_err,
        });
    }

    fs::copy(source, target).map_err(|err| FileOpError::Io {
        operation: "copy",
        path: source.to_path_buf(),
        source: err,
    })?;
    if let Err(err) = fs::remove_file(source) {
        if let Err(cleanup) = fs::remove_file(target) {
            warn!(
                target = %target.display(),
                error = %cleanup,
                "Failed to remove copy of unmovable file"
            );
        }
        return Err(FileOpError::Io {
            operation: "remove",
            path: source.to_path_buf(),
            source: err,
        });
    }
    Ok(())
}

fn target_in(source: &Path, destination_dir: &Path) -> PathBuf {
    destination_dir.join(source.file_name().unwrap_or_default())
}

/// Tracks the copied or cut selection and runs paste/remove.
pub struct FileOperations {
    copied: Vec<PathBuf>,
    cut: Vec<PathBuf>,
    settings: Arc<Settings>,
    trash: Box<dyn Trash>,
    can_paste_changed: Signal<bool>,
}

impl FileOperations {
    /// Use the system trash, falling back to a private trash folder.
    pub fn new(settings: Arc<Settings>) -> Self {
        Self::with_trash(
            settings,
            Box::new(SystemTrash::with_fallback(DirectoryTrash::default_location())),
        )
    }

    pub fn with_trash(settings: Arc<Settings>, trash: Box<dyn Trash>) -> Self {
        Self {
            copied: Vec::new(),
            cut: Vec::new(),
            settings,
            trash,
            can_paste_changed: Signal::new(),
        }
    }

    pub fn can_paste_changed(&mut self) -> &mut Signal<bool> {
        &mut self.can_paste_changed
    }

    /// Replace the copy selection and clear the cut selection.
    pub fn copy<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.copied = paths.into_iter().map(Into::into).collect();
        self.cut.clear();
        debug!(count = self.copied.len(), "Files copied");
        let can_paste = self.can_paste();
        self.can_paste_changed.emit(&can_paste);
    }

    /// Replace the cut selection and clear the copy selection.
    pub fn cut<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.cut = paths.into_iter().map(Into::into).collect();
        self.copied.clear();
        debug!(count = self.cut.len(), "Files cut");
        let can_paste = self.can_paste();
        self.can_paste_changed.emit(&can_paste);
    }

    pub fn can_paste(&self) -> bool {
        !self.copied.is_empty() || !self.cut.is_empty()
    }

    pub fn copied(&self) -> &[PathBuf] {
        &self.copied
    }

    pub fn cut_paths(&self) -> &[PathBuf] {
        &self.cut
    }

    /// Copy or move the selection into `destination`, then clear it.
    pub fn paste(&mut self, destination: &Path) -> OperationReport {
        let mut report = OperationReport::default();

        for source in std::mem::take(&mut self.copied) {
            report.record("copy", &source, copy_into(&source, destination));
        }

        for source in std::mem::take(&mut self.cut) {
            let result = if source.exists() {
                let target = target_in(&source, destination);
                if target.exists() {
                    Err(FileOpError::DestinationExists(target))
                } else {
                    move_path(&source, &target).map(|()| target)
                }
            } else {
                Err(FileOpError::Missing(source.clone()))
            };
            report.record("move", &source, result);
        }

        info!(
            destination = %destination.display(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Paste finished"
        );
        self.can_paste_changed.emit(&false);
        report
    }

    /// Delete `paths`: permanently when `FileSystem.DeletePermanently` is
    /// set, otherwise into the trash.
    pub fn remove<I, P>(&self, paths: I) -> OperationReport
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let permanent = self.settings.get_or(keys::DELETE_PERMANENTLY, false);
        let mut report = OperationReport::default();

        for path in paths.into_iter().map(Into::into) {
            let result = if permanent {
                delete_permanently(&path)
            } else {
                self.trash.trash(&path)
            };
            report.record(
                if permanent { "delete" } else { "trash" },
                &path,
                result.map(|()| path.clone()),
            );
        }

        report
    }
}

fn delete_permanently(path: &Path) -> Result<(), FileOpError> {
    if !path.exists() {
        return Err(FileOpError::Missing(path.to_path_buf()));
    }

    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|err| FileOpError::Io {
        operation: "delete",
        path: path.to_path_buf(),
        source: err,
    })
}

impl std::fmt::Debug for FileOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileOperations")
            .field("copied", &self.copied)
            .field("cut", &self.cut)
            .finish()
    }
}
