//! Image decoding into an RGB pixel buffer.

use facescan_models::ImageDimensions;
use image::RgbImage;

use crate::error::{VisionError, VisionResult};

/// Decoded upload: an RGB8 buffer in source-pixel coordinates.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    /// Wrap an RGB buffer, rejecting empty images.
    pub fn from_rgb(pixels: RgbImage) -> VisionResult<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::EmptyImage { width, height });
        }
        Ok(Self { pixels })
    }

    pub fn dimensions(&self) -> ImageDimensions {
        let (width, height) = self.pixels.dimensions();
        ImageDimensions::new(width, height)
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Decode raw upload bytes (JPEG, PNG, GIF, BMP, WebP, ...).
pub fn decode_image(bytes: &[u8]) -> VisionResult<DecodedImage> {
    if bytes.is_empty() {
        return Err(VisionError::decode("empty upload"));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| VisionError::decode(format!("unrecognized image format: {e}")))?;

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| VisionError::decode(format!("{format:?}: {e}")))?;

    DecodedImage::from_rgb(decoded.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 180, 160]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png_reports_true_dimensions() {
        let decoded = decode_image(&png_bytes(37, 21)).unwrap();
        assert_eq!(decoded.dimensions(), ImageDimensions::new(37, 21));
        assert_eq!(decoded.pixels().get_pixel(0, 0).0, [200, 180, 160]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, VisionError::Decode(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let bytes = png_bytes(16, 16);
        let err = decode_image(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, VisionError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert!(matches!(decode_image(&[]), Err(VisionError::Decode(_))));
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let err = DecodedImage::from_rgb(RgbImage::new(0, 5)).unwrap_err();
        assert!(matches!(err, VisionError::EmptyImage { width: 0, height: 5 }));
    }
}
