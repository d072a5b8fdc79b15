//! Thumbnail generation from media files

use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use super::{ThumbnailError, ThumbnailSize};
use crate::raw::embedded;
use crate::state::media::{classify, MediaKind};

/// Produces a thumbnail for one source file.
///
/// Implementations run on blocking worker threads and may take their time.
pub trait ThumbnailGenerator: Send + Sync + 'static {
    fn generate(&self, source: &Path, size: ThumbnailSize) -> Result<DynamicImage, ThumbnailError>;
}

/// Default generator.
///
/// - Still images are decoded with the `image` crate
/// - RAW files use their embedded JPEG preview
/// - Videos have no decoder and are reported as unsupported
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaThumbnailer;

impl ThumbnailGenerator for MediaThumbnailer {
    fn generate(&self, source: &Path, size: ThumbnailSize) -> Result<DynamicImage, ThumbnailError> {
        let full = match classify(source) {
            Some(MediaKind::Image) => decode_image(source)?,
            Some(MediaKind::RawImage) => decode_raw_preview(source)?,
            Some(MediaKind::Video) | None => {
                return Err(ThumbnailError::Unsupported(source.to_path_buf()))
            }
        };

        let thumbnail = fit(&full, size);
        debug!(
            path = %source.display(),
            width = thumbnail.width(),
            height = thumbnail.height(),
            "Generated thumbnail"
        );
        Ok(thumbnail)
    }
}

fn decode_image(source: &Path) -> Result<DynamicImage, ThumbnailError> {
    image::open(source).map_err(|err| match err {
        image::ImageError::IoError(io) => ThumbnailError::io(source, &io),
        other => ThumbnailError::Decode {
            path: source.to_path_buf(),
            reason: other.to_string(),
        },
    })
}

fn decode_raw_preview(source: &Path) -> Result<DynamicImage, ThumbnailError> {
    embedded::extract_preview(source)
        .map_err(|err| ThumbnailError::io(source, &err))?
        .ok_or_else(|| ThumbnailError::Decode {
            path: source.to_path_buf(),
            reason: "no embedded preview found".to_string(),
        })
}

/// Resize to fit inside `size`, keeping the aspect ratio. Images that
/// already fit are returned unchanged.
pub fn fit(image: &DynamicImage, size: ThumbnailSize) -> DynamicImage {
    if image.width() <= size.width && image.height() <= size.height {
        return image.clone();
    }
    image.resize(size.width, size.height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::tempdir;

    #[test]
    fn test_generate_fits_inside_requested_box() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        ImageBuffer::from_pixel(400, 200, Rgb([10u8, 20, 30]))
            .save(&path)
            .unwrap();

        let thumb = MediaThumbnailer
            .generate(&path, ThumbnailSize::square(100))
            .unwrap();
        assert_eq!((thumb.width(), thumb.height()), (100, 50));
    }

    #[test]
    fn test_small_images_are_not_upscaled() {
        let small = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(20, 10, Rgb([0u8, 0, 0])));
        let out = fit(&small, ThumbnailSize::square(100));
        assert_eq!((out.width(), out.height()), (20, 10));
    }

    #[test]
    fn test_failures() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not really a video").unwrap();
        let corrupt = dir.path().join("broken.jpg");
        std::fs::write(&corrupt, b"definitely not a jpeg").unwrap();
        let missing = dir.path().join("missing.png");

        let size = ThumbnailSize::default();
        assert_eq!(
            MediaThumbnailer.generate(&video, size),
            Err(ThumbnailError::Unsupported(video.clone()))
        );
        assert!(matches!(
            MediaThumbnailer.generate(&corrupt, size),
            Err(ThumbnailError::Decode { .. })
        ));
        assert_eq!(
            MediaThumbnailer.generate(&missing, size),
            Err(ThumbnailError::NotFound(missing.clone()))
        );
    }
}
