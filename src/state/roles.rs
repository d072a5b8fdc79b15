//! Named per-row fields exposed to a declarative binding layer

use chrono::{DateTime, Local};
use std::path::PathBuf;

use super::folder_model::FolderIndex;
use super::media::MediaKind;

/// Fields of a folder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderRole {
    Name,
    Path,
    MediaCount,
    Folder,
}

impl FolderRole {
    pub const ALL: [FolderRole; 4] = [Self::Name, Self::Path, Self::MediaCount, Self::Folder];

    /// The name a binding layer uses for this field.
    pub fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Path => "path",
            Self::MediaCount => "mediaCount",
            Self::Folder => "folder",
        }
    }
}

/// Fields of a media row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaRole {
    Name,
    Path,
    Date,
    Size,
    Type,
}

impl MediaRole {
    pub const ALL: [MediaRole; 5] = [Self::Name, Self::Path, Self::Date, Self::Size, Self::Type];

    pub fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Path => "path",
            Self::Date => "date",
            Self::Size => "size",
            Self::Type => "type",
        }
    }
}

/// A value returned by a model's data accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleValue {
    Text(String),
    Path(PathBuf),
    Count(usize),
    Bytes(u64),
    Date(DateTime<Local>),
    Kind(MediaKind),
    Folder(FolderIndex),
}
