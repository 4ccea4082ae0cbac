//! EXIF-aware preview generation.
//!
//! Reads a bounded prefix of the image (enough to contain the EXIF
//! segment; decoding the whole file just for orientation is wasteful),
//! applies the rotation/flip implied by one of the eight standard
//! orientation codes, and produces a compressed JPEG preview as a data
//! URL. Every failure is non-fatal: the upload proceeds without a preview.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use exif::{In, Tag};
use image::{imageops, DynamicImage};

use assetflow_core::models::FileLike;
use assetflow_core::UploadConfig;

/// An EXIF orientation code (1-8). Anything else is treated as normal.
pub type Orientation = u8;

/// Generates orientation-corrected preview images.
#[derive(Clone, Debug)]
pub struct ImagePreprocessor {
    max_dimension: u32,
    jpeg_quality: u8,
    exif_prefix_bytes: usize,
}

impl ImagePreprocessor {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_dimension: config.preview_max_dimension,
            jpeg_quality: config.preview_jpeg_quality,
            exif_prefix_bytes: config.exif_prefix_bytes,
        }
    }

    /// Produce a corrected preview data URL for an image file.
    ///
    /// Runs decode and re-encode on the blocking pool; they are bounded,
    /// non-preemptible steps. Returns `None` on any failure.
    pub async fn preprocess(&self, file: &FileLike) -> Option<String> {
        let bytes = file.bytes.clone()?;
        let this = self.clone();
        let name = file.name.clone();

        let result = tokio::task::spawn_blocking(move || this.preview_from_bytes(&bytes))
            .await
            .ok()
            .flatten();

        if result.is_none() {
            tracing::debug!(file = ?name, "Preview generation skipped");
        }
        result
    }

    /// Synchronous preview path: orientation read, decode, transform,
    /// thumbnail, JPEG encode, data URL.
    pub fn preview_from_bytes(&self, data: &[u8]) -> Option<String> {
        let orientation = self.read_orientation(data);
        let img = image::load_from_memory(data).ok()?;
        let img = apply_orientation(img, orientation);
        let thumb = img.thumbnail(self.max_dimension, self.max_dimension);

        let mut encoded = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality);
        thumb.to_rgb8().write_with_encoder(encoder).ok()?;

        Some(format!("data:image/jpeg;base64,{}", BASE64.encode(&encoded)))
    }

    /// Read the EXIF orientation tag from a bounded prefix of the file.
    ///
    /// Returns 1 (normal) when the prefix holds no readable EXIF segment.
    pub fn read_orientation(&self, data: &[u8]) -> Orientation {
        let prefix = &data[..data.len().min(self.exif_prefix_bytes)];
        let mut cursor = Cursor::new(prefix);
        let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
            return 1;
        };

        if let Some(make) = exif
            .get_field(Tag::Make, In::PRIMARY)
            .map(|f| f.display_value().to_string())
        {
            // Manufacturer strings are frequently NUL-terminated and break
            // downstream consumers expecting valid encodings.
            tracing::trace!(make = %sanitize_null_terminated(&make), "EXIF manufacturer");
        }

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(|v| u8::try_from(v).ok())
            .filter(|v| (1..=8).contains(v))
            .unwrap_or(1)
    }
}

/// Truncate a metadata string at the first NUL byte and trim whitespace.
pub fn sanitize_null_terminated(raw: &str) -> &str {
    raw.split('\0').next().unwrap_or("").trim()
}

/// Apply the rotation/flip implied by an EXIF orientation code.
pub fn apply_orientation(mut img: DynamicImage, orientation: Orientation) -> DynamicImage {
    let (rotate, flip_h, flip_v) = orientation_transforms(orientation);

    tracing::debug!(
        orientation = orientation,
        rotate = ?rotate,
        flip_horizontal = flip_h,
        flip_vertical = flip_v,
        "Applying EXIF orientation"
    );

    if let Some(angle) = rotate {
        img = match angle {
            90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
            180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
            270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
            _ => img,
        };
    }

    if flip_h {
        img = DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()));
    }
    if flip_v {
        img = DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()));
    }

    img
}

/// Rotation and flips for a given EXIF orientation.
/// Returns (rotate_angle, flip_horizontal, flip_vertical).
pub fn orientation_transforms(orientation: Orientation) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),      // Normal
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(270), true, false),  // Mirror horizontal + Rotate 270 CW
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(90), true, false),   // Mirror horizontal + Rotate 90 CW
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),      // Invalid, treat as normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};

    fn preprocessor() -> ImagePreprocessor {
        ImagePreprocessor::new(&UploadConfig::default())
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_orientation_transforms_all_values() {
        for orientation in 1..=8u8 {
            let (rotate, _flip_h, _flip_v) = orientation_transforms(orientation);
            if let Some(angle) = rotate {
                assert!([90, 180, 270].contains(&angle));
            }
        }
        // Out-of-range codes are normal orientation
        assert_eq!(orientation_transforms(0), (None, false, false));
        assert_eq!(orientation_transforms(9), (None, false, false));
    }

    #[test]
    fn test_apply_orientation_swaps_dimensions_on_quarter_turns() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255])));
        assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (2, 4));
        assert_eq!(apply_orientation(img.clone(), 8).dimensions(), (2, 4));
        assert_eq!(apply_orientation(img.clone(), 3).dimensions(), (4, 2));
        assert_eq!(apply_orientation(img, 1).dimensions(), (4, 2));
    }

    #[test]
    fn test_read_orientation_defaults_to_normal() {
        // PNG without EXIF
        assert_eq!(preprocessor().read_orientation(&png_bytes(10, 10)), 1);
        // Garbage bytes
        assert_eq!(preprocessor().read_orientation(b"not an image"), 1);
        // Empty
        assert_eq!(preprocessor().read_orientation(b""), 1);
    }

    #[test]
    fn test_sanitize_null_terminated() {
        assert_eq!(sanitize_null_terminated("Canon\0\0\0"), "Canon");
        assert_eq!(sanitize_null_terminated("NIKON CORP"), "NIKON CORP");
        assert_eq!(sanitize_null_terminated("\0"), "");
        assert_eq!(sanitize_null_terminated("  Sony \0junk"), "Sony");
    }

    #[test]
    fn test_preview_from_bytes_produces_data_url() {
        let preview = preprocessor().preview_from_bytes(&png_bytes(800, 600));
        let url = preview.expect("valid image should produce a preview");
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_preview_failure_is_none() {
        assert_eq!(preprocessor().preview_from_bytes(b"not an image"), None);
    }

    #[tokio::test]
    async fn test_preprocess_skips_silently_without_bytes() {
        let file = FileLike::unnamed("image/png", 128);
        assert_eq!(preprocessor().preprocess(&file).await, None);
    }

    #[tokio::test]
    async fn test_preprocess_with_bytes() {
        let file = FileLike::new("pic.png", "image/png", Bytes::from(png_bytes(64, 64)));
        let preview = preprocessor().preprocess(&file).await;
        assert!(preview.is_some());
    }
}
