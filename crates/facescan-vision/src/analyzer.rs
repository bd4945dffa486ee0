//! The face analysis capability consumed by the service.

use facescan_models::FaceAnalysis;

use crate::decode::DecodedImage;
use crate::error::VisionResult;

/// Detects every face in an image and analyzes each one in a single pass:
/// bounding box, 68 landmarks, expression probabilities, age and gender.
///
/// Implementations are shared read-only across concurrent requests and are
/// called from the blocking thread pool.
pub trait FaceAnalyzer: Send + Sync {
    /// Analyze all faces in `image`, in the analyzer's native order.
    ///
    /// Coordinates are in the pixel space of `image`. An empty vector means
    /// no face was found.
    fn detect_all(&self, image: &DecodedImage) -> VisionResult<Vec<FaceAnalysis>>;

    /// Names of the models backing this analyzer.
    fn loaded_models(&self) -> Vec<String>;
}
