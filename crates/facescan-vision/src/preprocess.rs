//! Conversion of decoded images into model input tensors.
//!
//! Two inputs are produced per image:
//! - the detector input: whole image scaled to fit 512x512 and padded to a
//!   square (anchored top-left), scaled to `[-1,1]`
//! - one face crop per detection: box region scaled to fit 112x112 and
//!   padded to a centered square, scaled to `[0,1]`
//!
//! Both remember how to map normalized model coordinates back into the
//! source image.

use facescan_models::{BoundingBox, Point};
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::decode::DecodedImage;

/// Detector input side length.
pub const DETECTOR_INPUT_SIZE: u32 = 512;

/// Side length of the face crop fed to the per-face models.
pub const FACE_INPUT_SIZE: u32 = 112;

/// Value range pixels are scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelScale {
    /// `[0, 1]`
    Unit,
    /// `[-1, 1]`
    Signed,
}

impl PixelScale {
    #[inline]
    fn apply(self, v: u8) -> f32 {
        let unit = v as f32 / 255.0;
        match self {
            PixelScale::Unit => unit,
            PixelScale::Signed => unit * 2.0 - 1.0,
        }
    }
}

/// Where the original content sits inside a padded square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadAnchor {
    TopLeft,
    Center,
}

/// NCHW float tensor with batch size 1.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

/// Convert an RGB image (HWC) to a `[1, 3, H, W]` tensor.
pub fn to_chw(img: &RgbImage, scale: PixelScale) -> InputTensor {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    let raw = img.as_raw();

    let mut data = Vec::with_capacity(w * h * 3);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                data.push(scale.apply(raw[(y * w + x) * 3 + c]));
            }
        }
    }

    InputTensor {
        shape: [1, 3, h, w],
        data,
    }
}

/// Scale an image so its longer side is `target`, then pad it with black to
/// a `target` x `target` square.
///
/// The image is shrunk before padding, so memory stays bounded by `target`
/// however elongated the source is. Each side keeps at least one pixel.
pub fn fit_to_square(img: &RgbImage, target: u32, anchor: PadAnchor) -> RgbImage {
    let (w, h) = img.dimensions();
    let scale = target as f64 / w.max(h) as f64;
    let fit_w = ((w as f64 * scale).round() as u32).clamp(1, target);
    let fit_h = ((h as f64 * scale).round() as u32).clamp(1, target);

    let fitted = imageops::resize(img, fit_w, fit_h, FilterType::Triangle);
    if fit_w == target && fit_h == target {
        return fitted;
    }

    let (off_x, off_y) = match anchor {
        PadAnchor::TopLeft => (0, 0),
        PadAnchor::Center => ((target - fit_w) / 2, (target - fit_h) / 2),
    };

    let mut square = RgbImage::new(target, target);
    imageops::replace(&mut square, &fitted, off_x as i64, off_y as i64);
    square
}

/// Detector input plus the scale that maps normalized boxes to pixels.
#[derive(Debug, Clone)]
pub struct DetectorInput {
    pub tensor: InputTensor,
    /// Side of the padded square in source pixels.
    pub side: f64,
}

/// Build the detector input for a whole image.
pub fn detector_input(image: &DecodedImage) -> DetectorInput {
    let square = fit_to_square(image.pixels(), DETECTOR_INPUT_SIZE, PadAnchor::TopLeft);

    DetectorInput {
        tensor: to_chw(&square, PixelScale::Signed),
        side: image.dimensions().max_side() as f64,
    }
}

/// Face crop plus the transform back into source pixels.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    pub tensor: InputTensor,
    /// Source-pixel position of the padded square's top-left corner.
    pub origin: Point,
    /// Side of the padded square in source pixels.
    pub side: f64,
}

impl FaceCrop {
    /// Map a point normalized to the crop (`0..1`) into source pixels.
    #[inline]
    pub fn to_image_coords(&self, nx: f32, ny: f32) -> Point {
        Point::new(
            self.origin.x + nx as f64 * self.side,
            self.origin.y + ny as f64 * self.side,
        )
    }
}

/// Cut out a face box, pad it to a centered square and resize it.
///
/// Returns `None` when the box does not cover any pixel of the image.
pub fn face_crop(image: &DecodedImage, bbox: &BoundingBox) -> Option<FaceCrop> {
    let dims = image.dimensions();
    let clipped = bbox.clip_to(dims);

    let x0 = clipped.x.floor().max(0.0) as u32;
    let y0 = clipped.y.floor().max(0.0) as u32;
    let x1 = (clipped.x2().ceil() as u32).min(dims.width);
    let y1 = (clipped.y2().ceil() as u32).min(dims.height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let (w, h) = (x1 - x0, y1 - y0);
    let region = imageops::crop_imm(image.pixels(), x0, y0, w, h).to_image();
    let square = fit_to_square(&region, FACE_INPUT_SIZE, PadAnchor::Center);
    let side = w.max(h);

    Some(FaceCrop {
        tensor: to_chw(&square, PixelScale::Unit),
        origin: Point::new(
            x0 as f64 - ((side - w) / 2) as f64,
            y0 as f64 - ((side - h) / 2) as f64,
        ),
        side: side as f64,
    })
}
