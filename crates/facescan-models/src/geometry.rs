//! Geometric primitives in source-image pixel coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build a box from its two corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Compute Intersection over Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.x2().min(other.x2());
        let y2 = self.y2().min(other.y2());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Clip the box so it lies entirely inside an image of the given size.
    pub fn clip_to(&self, dims: ImageDimensions) -> BoundingBox {
        let max_x = dims.width as f64;
        let max_y = dims.height as f64;
        let x1 = self.x.clamp(0.0, max_x);
        let y1 = self.y.clamp(0.0, max_y);
        let x2 = self.x2().clamp(0.0, max_x);
        let y2 = self.y2().clamp(0.0, max_y);
        BoundingBox::from_corners(x1, y1, x2, y2)
    }

    /// Check that the box has a positive area.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.x.is_finite() && self.y.is_finite()
    }
}

/// A single 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a decoded source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the longer side.
    pub fn max_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

impl std::fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
