//! Embedded JPEG preview extraction
//!
//! Camera RAW files carry one or more JPEG previews. Reading them is far
//! cheaper than demosaicing the sensor data, and they are large enough for
//! thumbnails.

use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// JPEG Start Of Image marker
const JPEG_START: [u8; 2] = [0xFF, 0xD8];
/// JPEG End Of Image marker
const JPEG_END: [u8; 2] = [0xFF, 0xD9];

/// Prefix scans tried in order: (bytes read, minimum JPEG size).
///
/// Most cameras store the preview near the start of the file, so the cheap
/// scans usually succeed.
const PREFIX_TIERS: [(usize, usize); 3] = [
    (256 * 1024, 50_000),
    (512 * 1024, 30_000),
    (5 * 1024 * 1024, 10_000),
];

/// How many start markers a prefix scan inspects before giving up.
const MAX_CANDIDATES: usize = 6;

/// Decode the best embedded preview of a RAW file.
///
/// Returns `Ok(None)` when the file holds no decodable JPEG.
pub fn extract_preview(raw_path: &Path) -> io::Result<Option<DynamicImage>> {
    for (tier, (max_bytes, min_size)) in PREFIX_TIERS.iter().enumerate() {
        let data = read_prefix(raw_path, *max_bytes)?;
        if let Some(jpeg) = first_jpeg(&data, *min_size) {
            if let Some(image) = decode_jpeg(jpeg) {
                debug!(path = %raw_path.display(), tier = tier + 1, "Found embedded preview");
                return Ok(Some(image));
            }
        }
    }

    // Last resort: read the whole file and try every JPEG, largest first
    let mut data = Vec::new();
    File::open(raw_path)?.read_to_end(&mut data)?;

    let mut candidates = all_jpegs(&data);
    candidates.sort_by_key(|jpeg| std::cmp::Reverse(jpeg.len()));

    for jpeg in candidates {
        if let Some(image) = decode_jpeg(jpeg) {
            debug!(
                path = %raw_path.display(),
                size_kb = jpeg.len() / 1024,
                "Found embedded preview in full scan"
            );
            return Ok(Some(image));
        }
    }

    Ok(None)
}

fn read_prefix(path: &Path, max_bytes: usize) -> io::Result<Vec<u8>> {
    let mut data = Vec::with_capacity(max_bytes);
    File::open(path)?
        .take(max_bytes as u64)
        .read_to_end(&mut data)?;
    Ok(data)
}

fn decode_jpeg(data: &[u8]) -> Option<DynamicImage> {
    image::load_from_memory_with_format(data, ImageFormat::Jpeg).ok()
}

/// Find the end of the JPEG starting at `start`, inclusive of the end marker.
fn jpeg_at(data: &[u8], start: usize) -> Option<&[u8]> {
    let end = data[start..]
        .windows(2)
        .position(|window| window == JPEG_END)?;
    Some(&data[start..start + end + 2])
}

/// The first JPEG larger than `min_size` among the first few start markers.
pub fn first_jpeg(data: &[u8], min_size: usize) -> Option<&[u8]> {
    data.windows(2)
        .enumerate()
        .filter(|(_, window)| *window == JPEG_START)
        .take(MAX_CANDIDATES)
        .filter_map(|(start, _)| jpeg_at(data, start))
        .find(|jpeg| jpeg.len() > min_size)
}

/// Every JPEG delimited by start and end markers, with no size filter.
pub fn all_jpegs(data: &[u8]) -> Vec<&[u8]> {
    data.windows(2)
        .enumerate()
        .filter(|(_, window)| *window == JPEG_START)
        .filter_map(|(start, _)| jpeg_at(data, start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 255) as u8, (y % 255) as u8, 90u8])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_first_jpeg_respects_min_size() {
        let mut data = vec![0u8; 16];
        data.extend_from_slice(&[0xFF, 0xD8, 1, 2, 0xFF, 0xD9]);
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&[0xFF, 0xD8]);
        data.extend_from_slice(&[7u8; 64]);
        data.extend_from_slice(&[0xFF, 0xD9]);

        assert_eq!(first_jpeg(&data, 10).map(<[u8]>::len), Some(68));
        assert_eq!(first_jpeg(&data, 1).map(<[u8]>::len), Some(6));
        assert!(first_jpeg(&data, 100).is_none());
        assert_eq!(all_jpegs(&data).len(), 2);
    }

    #[test]
    fn test_extract_preview_from_fake_raw() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.nef");

        let mut contents = b"II*\0 fake tiff header".to_vec();
        contents.extend_from_slice(&jpeg_bytes(64, 48));
        contents.extend_from_slice(&[0u8; 128]);
        std::fs::write(&path, contents).unwrap();

        let preview = extract_preview(&path).unwrap().unwrap();
        assert_eq!((preview.width(), preview.height()), (64, 48));
    }

    #[test]
    fn test_extract_preview_without_jpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.cr2");
        std::fs::write(&path, vec![1u8; 1024]).unwrap();

        assert!(extract_preview(&path).unwrap().is_none());
        assert!(extract_preview(&dir.path().join("missing.cr2")).is_err());
    }
}
