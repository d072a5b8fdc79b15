//! RAW image support
//!
//! Thumbnails of camera RAW files come from the JPEG previews embedded in
//! them rather than from the sensor data.

pub mod embedded;
