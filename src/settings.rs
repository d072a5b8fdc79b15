//! Typed key/value settings
//!
//! Settings are stored as JSON values keyed by dotted names
//! (`FileSystem.DeletePermanently`). Every key is initialized with a default
//! at startup, so readers can rely on it being present.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::thumbnail::cache::default_cache_dir;

/// Well-known setting keys
pub mod keys {
    pub const DELETE_PERMANENTLY: &str = "FileSystem.DeletePermanently";
    pub const RESTORE_LAST_VISITED_FOLDER: &str = "General.RestoreLastVisitedFolder";
    pub const LAST_VISITED_FOLDER: &str = "General.LastVisitedFolder";
    pub const SORT_BY: &str = "Media.SortBy";
    pub const SORT_ORDER: &str = "Media.SortOrder";
    pub const THUMBNAIL_SIZE: &str = "Media.ThumbnailSize";
    pub const USE_CACHE: &str = "MediaPreviewProvider.UseCache";
    pub const CACHE_PATH: &str = "MediaPreviewProvider.CachePath";
}

/// Application folder name under the platform config directory
const SETTINGS_APP_DIR: &str = "media-viewer";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("setting '{key}' has an unexpected type: {source}")]
    Type {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("setting '{0}' is not initialized")]
    Missing(String),
}

/// Shared settings store. Wrap in an `Arc` to hand it to components.
#[derive(Debug, Default)]
pub struct Settings {
    path: Option<PathBuf>,
    values: RwLock<BTreeMap<String, Value>>,
}

impl Settings {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        info!(path = %path.display(), keys = values.len(), "Settings loaded");
        Ok(Self {
            path: Some(path),
            values: RwLock::new(values),
        })
    }

    /// Get the path where the settings should be stored
    /// - Linux: ~/.config/media-viewer/settings.json
    /// - macOS: ~/Library/Application Support/media-viewer/settings.json
    /// - Windows: %APPDATA%\media-viewer\settings.json
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir);

        path.push(SETTINGS_APP_DIR);
        path.push("settings.json");
        path
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set `key` to `default` unless it already has a value.
    pub fn init<T: Serialize>(&self, key: &str, default: T) -> Result<(), SettingsError> {
        let mut values = self.values.write();
        if !values.contains_key(key) {
            values.insert(key.to_string(), serde_json::to_value(default)?);
        }
        Ok(())
    }

    /// Initialize every key the application reads.
    pub fn init_defaults(&self) -> Result<(), SettingsError> {
        self.init(keys::DELETE_PERMANENTLY, false)?;
        self.init(keys::RESTORE_LAST_VISITED_FOLDER, true)?;
        self.init(keys::LAST_VISITED_FOLDER, "")?;
        self.init(keys::SORT_BY, 0)?;
        self.init(keys::SORT_ORDER, 0)?;
        self.init(keys::THUMBNAIL_SIZE, 170)?;
        self.init(keys::USE_CACHE, true)?;
        self.init(keys::CACHE_PATH, default_cache_dir().to_string_lossy().to_string())?;
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
        let value = self
            .values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SettingsError::Missing(key.to_string()))?;

        serde_json::from_value(value).map_err(|source| SettingsError::Type {
            key: key.to_string(),
            source,
        })
    }

    /// Like `get`, but falls back when the key is missing or mistyped.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.get(key) {
            Ok(value) => value,
            Err(SettingsError::Missing(_)) => fallback,
            Err(err) => {
                warn!(key, error = %err, "Ignoring invalid setting");
                fallback
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), SettingsError> {
        let value = serde_json::to_value(value)?;
        debug!(key, value = %value, "Setting changed");
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    /// Write the store to its file. In-memory stores ignore this.
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let text = serde_json::to_string_pretty(&*self.values.read())?;
        fs::write(path, text).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }
}
