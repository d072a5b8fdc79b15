//! Thumbnail generation and caching
//!
//! This module handles:
//! - Generating thumbnails from images and RAW previews (generator.rs)
//! - Fingerprinting sources and caching thumbnails on disk (cache.rs)
//! - Serving thumbnails asynchronously off the UI thread (provider.rs)

pub mod cache;
pub mod generator;
pub mod provider;

use std::path::PathBuf;
use thiserror::Error;

pub use cache::{CacheKey, DiskCache};
pub use generator::{MediaThumbnailer, ThumbnailGenerator};
pub use provider::{
    ProviderConfig, Thumbnail, ThumbnailOrigin, ThumbnailProvider, ThumbnailRequest,
};

/// Edge length used when a requested dimension is zero
pub const DEFAULT_THUMBNAIL_EDGE: u32 = 256;

/// Requested bounding box of a thumbnail.
///
/// Thumbnails keep the source aspect ratio and fit inside this box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> Self {
        let or_default = |edge: u32| if edge == 0 { DEFAULT_THUMBNAIL_EDGE } else { edge };
        Self {
            width: or_default(width),
            height: or_default(height),
        }
    }

    pub fn square(edge: u32) -> Self {
        Self::new(edge, edge)
    }
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self::square(DEFAULT_THUMBNAIL_EDGE)
    }
}

/// Why a thumbnail could not be produced.
///
/// Reasons are carried as text so one failure can be handed to every
/// requester waiting on the same key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ThumbnailError {
    #[error("source file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("no thumbnail support for {0:?}")]
    Unsupported(PathBuf),

    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("thumbnail worker failed: {0}")]
    Worker(String),

    #[error("thumbnail request was cancelled")]
    Cancelled,
}

impl ThumbnailError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io {
                path,
                reason: err.to_string(),
            }
        }
    }
}
