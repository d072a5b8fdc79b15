//! Application context
//!
//! Owns the async runtime, the settings store and every model. Built once at
//! startup and handed to the presentation layer; `shutdown` tears it down in
//! order (persist settings, drop models, stop the runtime).

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::fs::{FileOperations, OperationReport};
use crate::settings::{keys, Settings};
use crate::state::{Folder, FolderModel, MediaModel, SortKey, SortOrder};
use crate::thumbnail::{ProviderConfig, ThumbnailProvider};

/// How long shutdown waits for in-flight thumbnail work
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct AppContext {
    settings: Arc<Settings>,
    runtime: Runtime,
    thumbnails: ThumbnailProvider,
    file_ops: FileOperations,
    folders: FolderModel,
    media: MediaModel,
}

impl AppContext {
    pub fn new(settings: Arc<Settings>) -> Result<Self> {
        settings.init_defaults()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("media-viewer-worker")
            .enable_all()
            .build()
            .map_err(AppError::Runtime)?;

        let thumbnails = ThumbnailProvider::new(
            ProviderConfig::from_settings(&settings),
            runtime.handle().clone(),
        );

        let mut media = MediaModel::new();
        media.set_sort_key(SortKey::from_setting(settings.get_or(keys::SORT_BY, 0)));
        media.set_sort_order(SortOrder::from_setting(settings.get_or(keys::SORT_ORDER, 0)));

        let file_ops = FileOperations::new(Arc::clone(&settings));

        info!(settings = ?settings.path(), "Application context ready");
        Ok(Self {
            settings,
            runtime,
            thumbnails,
            file_ops,
            folders: FolderModel::new(),
            media,
        })
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn thumbnails(&self) -> &ThumbnailProvider {
        &self.thumbnails
    }

    pub fn folders(&self) -> &FolderModel {
        &self.folders
    }

    pub fn folders_mut(&mut self) -> &mut FolderModel {
        &mut self.folders
    }

    pub fn media(&self) -> &MediaModel {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut MediaModel {
        &mut self.media
    }

    pub fn file_ops(&self) -> &FileOperations {
        &self.file_ops
    }

    pub fn file_ops_mut(&mut self) -> &mut FileOperations {
        &mut self.file_ops
    }

    /// Show `path` in the media list and remember it as the last visited folder.
    pub fn open_folder(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(AppError::NotAFolder(path.to_path_buf()));
        }

        let changed = self.media.set_root(path);
        self.settings
            .set(keys::LAST_VISITED_FOLDER, path.to_string_lossy().into_owned())?;
        Ok(changed)
    }

    /// Reopen the last visited folder if restoring is enabled and it still exists.
    pub fn restore_last_folder(&mut self) -> Result<Option<PathBuf>> {
        if !self.settings.get_or(keys::RESTORE_LAST_VISITED_FOLDER, true) {
            return Ok(None);
        }

        let last: String = self.settings.get_or(keys::LAST_VISITED_FOLDER, String::new());
        let last = PathBuf::from(last);
        if last.as_os_str().is_empty() || !last.is_dir() {
            return Ok(None);
        }

        self.open_folder(&last)?;
        Ok(Some(last))
    }

    /// Replace the folder tree with `roots`, each scanned `depth` levels deep.
    pub fn show_folders<P: AsRef<Path>>(&mut self, roots: &[P], depth: usize) {
        self.folders.clear();
        for root in roots {
            let folder = Folder::scan(root, depth);
            self.folders.append_root(&folder);
        }
    }

    /// Change the sort spec and persist it.
    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) -> Result<()> {
        self.media.set_sort_key(key);
        self.media.set_sort_order(order);
        self.persist_sort()
    }

    fn persist_sort(&self) -> Result<()> {
        let spec = self.media.sort_spec();
        self.settings.set(keys::SORT_BY, spec.key.to_setting())?;
        self.settings.set(keys::SORT_ORDER, spec.order.to_setting())?;
        Ok(())
    }

    fn shows(&self, folder: Option<&Path>) -> bool {
        match (self.media.root(), folder) {
            (Some(root), Some(folder)) => root == folder,
            _ => false,
        }
    }

    /// Paste the clipboard into `destination`, refreshing the media list if
    /// it shows either end of the operation.
    pub fn paste(&mut self, destination: &Path) -> OperationReport {
        let moved_out = self
            .file_ops
            .cut_paths()
            .iter()
            .any(|source| self.shows(source.parent()));

        let report = self.file_ops.paste(destination);
        if moved_out || self.shows(Some(destination)) {
            debug!("Media list affected by paste");
            self.media.refresh();
        }
        report
    }

    /// Remove `paths`, refreshing the media list if it showed any of them.
    pub fn remove<I, P>(&mut self, paths: I) -> OperationReport
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let report = self.file_ops.remove(paths);
        if report.succeeded.iter().any(|path| self.shows(path.parent())) {
            debug!("Media list affected by remove");
            self.media.refresh();
        }
        report
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn shutdown(self) -> Result<()> {
        self.persist_sort()?;
        self.settings.save()?;

        let Self {
            runtime,
            thumbnails,
            file_ops,
            folders,
            media,
            ..
        } = self;
        drop(media);
        drop(folders);
        drop(file_ops);
        drop(thumbnails);

        runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        info!("Application context shut down");
        Ok(())
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("settings", &self.settings.path())
            .field("media_root", &self.media.root())
            .field("thumbnails", &self.thumbnails)
            .finish()
    }
}
