//! On-disk thumbnail cache
//!
//! Entries are keyed by a fingerprint of the source file (path, modification
//! time and size) plus the requested size. A source that changes gets a new
//! fingerprint, so stale thumbnails are never served; they are simply left
//! behind until the cache is cleared.

use image::{DynamicImage, ImageFormat};
use std::fmt;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

use super::{ThumbnailError, ThumbnailSize};

/// Application folder name under the platform cache directory
const CACHE_APP_DIR: &str = "media-viewer";

/// Get the default thumbnail cache directory
/// Returns ~/.cache/media-viewer/thumbnails on Linux
pub fn default_cache_dir() -> PathBuf {
    let mut path = dirs_next::cache_dir()
        .or_else(dirs_next::home_dir)
        .unwrap_or_else(std::env::temp_dir);

    path.push(CACHE_APP_DIR);
    path.push("thumbnails");
    path
}

/// Identity of one cached thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    fingerprint: String,
    size: ThumbnailSize,
}

impl CacheKey {
    /// Build a key from the source's metadata.
    pub fn from_metadata(source: &Path, metadata: &Metadata, size: ThumbnailSize) -> Self {
        let modified_ns = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |since| since.as_nanos());

        let mut hasher = blake3::Hasher::new();
        hasher.update(source.to_string_lossy().as_bytes());
        hasher.update(&modified_ns.to_le_bytes());
        hasher.update(&metadata.len().to_le_bytes());
        let hash = hasher.finalize();

        Self {
            fingerprint: hash.to_hex()[..32].to_string(),
            size,
        }
    }

    /// Build a key by reading the source's metadata.
    pub fn for_source(source: &Path, size: ThumbnailSize) -> Result<Self, ThumbnailError> {
        let metadata = fs::metadata(source).map_err(|err| ThumbnailError::io(source, &err))?;
        Ok(Self::from_metadata(source, &metadata, size))
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn size(&self) -> ThumbnailSize {
        self.size
    }

    /// File name of the cached thumbnail.
    pub fn file_name(&self) -> String {
        format!("{}_{}x{}.jpg", self.fingerprint, self.size.width, self.size.height)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}x{}", self.fingerprint, self.size.width, self.size.height)
    }
}

/// A directory of encoded thumbnails.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Load a cached thumbnail.
    ///
    /// A missing entry is `None`. An entry that fails to decode is deleted
    /// and also reported as `None` so it gets regenerated.
    pub fn load(&self, key: &CacheKey) -> Option<DynamicImage> {
        let path = self.path_for(key);
        if !path.is_file() {
            return None;
        }

        match image::open(&path) {
            Ok(image) => {
                debug!(key = %key, "Thumbnail cache hit");
                Some(image)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Discarding corrupt cached thumbnail");
                if let Err(err) = fs::remove_file(&path) {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to remove corrupt thumbnail"
                    );
                }
                None
            }
        }
    }

    /// Encode and store a thumbnail, returning its path.
    ///
    /// The file is written next to its final name and renamed into place so
    /// readers never observe a partial entry.
    pub fn store(&self, key: &CacheKey, image: &DynamicImage) -> Result<PathBuf, ThumbnailError> {
        fs::create_dir_all(&self.dir).map_err(|err| ThumbnailError::io(&self.dir, &err))?;

        let path = self.path_for(key);
        let partial = path.with_extension("part");

        // JPEG has no alpha channel
        DynamicImage::ImageRgb8(image.to_rgb8())
            .save_with_format(&partial, ImageFormat::Jpeg)
            .map_err(|err| ThumbnailError::Io {
                path: partial.clone(),
                reason: err.to_string(),
            })?;
        fs::rename(&partial, &path).map_err(|err| ThumbnailError::io(&path, &err))?;

        debug!(key = %key, path = %path.display(), "Stored thumbnail");
        Ok(path)
    }

    /// Delete every cached thumbnail. Returns how many files were removed.
    pub fn clear(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to remove cached thumbnail"
                ),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::tempdir;

    #[test]
    fn test_key_changes_with_source_and_size() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("photo.jpg");
        fs::write(&source, b"first").unwrap();

        let small = CacheKey::for_source(&source, ThumbnailSize::square(64)).unwrap();
        let again = CacheKey::for_source(&source, ThumbnailSize::square(64)).unwrap();
        let large = CacheKey::for_source(&source, ThumbnailSize::square(128)).unwrap();
        assert_eq!(small, again);
        assert_eq!(small.fingerprint(), large.fingerprint());
        assert_ne!(small, large);

        fs::write(&source, b"second, longer contents").unwrap();
        let changed = CacheKey::for_source(&source, ThumbnailSize::square(64)).unwrap();
        assert_ne!(small.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_key_for_missing_source() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone.jpg");
        assert_eq!(
            CacheKey::for_source(&missing, ThumbnailSize::default()),
            Err(ThumbnailError::NotFound(missing.clone()))
        );
    }

    #[test]
    fn test_store_then_load_drops_alpha() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("icon.png");
        fs::write(&source, b"x").unwrap();
        let cache = DiskCache::new(dir.path().join("cache"));
        let key = CacheKey::for_source(&source, ThumbnailSize::square(32)).unwrap();

        assert!(cache.load(&key).is_none());
        let pixel = Rgba([200u8, 0, 0, 128]);
        let image = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(32, 16, pixel));
        let stored = cache.store(&key, &image).unwrap();

        assert!(stored.ends_with(key.file_name()));
        let loaded = cache.load(&key).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (32, 16));
        assert_eq!(cache.clear(), 1);
        assert!(cache.load(&key).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_discarded() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("photo.jpg");
        fs::write(&source, b"x").unwrap();
        let cache = DiskCache::new(dir.path());
        let key = CacheKey::for_source(&source, ThumbnailSize::default()).unwrap();

        fs::write(cache.path_for(&key), b"garbage").unwrap();
        assert!(cache.load(&key).is_none());
        assert!(!cache.path_for(&key).exists());
    }
}
