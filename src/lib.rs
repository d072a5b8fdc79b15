//! Media viewer core
//!
//! Read models for a folder tree and the media list of the active folder, an
//! asynchronous thumbnail provider with an on-disk cache, clipboard-style file
//! operations and a persistent settings store. `AppContext` wires them
//! together for a presentation layer.

pub mod context;
pub mod error;
pub mod fs;
pub mod logging;
pub mod raw;
pub mod settings;
pub mod state;
pub mod thumbnail;

pub use context::AppContext;
pub use error::AppError;
pub use settings::Settings;
