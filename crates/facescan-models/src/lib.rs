//! Shared data models for the FaceScan service.
//!
//! This crate provides Serde-serializable types for:
//! - Geometry in source-image pixel coordinates
//! - Per-face analysis results
//! - The `/predict_face` response and error bodies

pub mod face;
pub mod geometry;
pub mod response;

// Re-export common types
pub use face::{Expressions, FaceAnalysis, Gender, LANDMARK_COUNT};
pub use geometry::{BoundingBox, ImageDimensions, Point};
pub use response::{round_age, unit_probability, AnalysisResponse, DetectionBox, ErrorBody};
