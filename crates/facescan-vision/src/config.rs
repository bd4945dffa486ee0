//! Tunables for detector post-processing.

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    /// Minimum detector score for a face to be kept.
    pub min_confidence: f32,
    /// IoU above which overlapping detections are suppressed.
    pub iou_threshold: f64,
    /// Maximum number of faces analyzed per image.
    pub max_faces: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            iou_threshold: 0.5,
            max_faces: 100,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }
}
