//! UI-facing state
//!
//! This module holds the read models a binding layer consumes:
//! - Path normalization and lookup shared by both models (path_index.rs)
//! - The folder tree (folder.rs, folder_model.rs)
//! - The media list of the active folder (media.rs, media_model.rs)
//! - Row roles and change notifications (roles.rs, signal.rs)

pub mod folder;
pub mod folder_model;
pub mod media;
pub mod media_model;
pub mod path_index;
pub mod roles;
pub mod signal;

pub use folder::Folder;
pub use folder_model::{FolderIndex, FolderModel};
pub use media::{MediaEntry, MediaKind, MediaScanner};
pub use media_model::{MediaIndex, MediaModel, SortKey, SortOrder, SortSpec};
pub use roles::{FolderRole, MediaRole, RoleValue};
pub use signal::{Change, Signal};
