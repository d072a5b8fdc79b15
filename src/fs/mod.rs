//! File operations on media
//!
//! - Clipboard-style copy, cut, paste and remove (operations.rs)
//! - Recoverable deletion through a trash facility (trash.rs)

pub mod operations;
pub mod trash;

pub use operations::{FileOpError, FileOperations, OperationReport};
pub use trash::{DirectoryTrash, SystemTrash, Trash};
