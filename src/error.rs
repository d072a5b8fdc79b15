use std::path::PathBuf;
use thiserror::Error;

use crate::fs::FileOpError;
use crate::logging::LoggingError;
use crate::settings::SettingsError;
use crate::thumbnail::ThumbnailError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error(transparent)]
    FileOp(#[from] FileOpError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("not a folder: {0:?}")]
    NotAFolder(PathBuf),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
