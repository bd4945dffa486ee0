//! Wire format of the `/predict_face` endpoint.

use serde::{Deserialize, Serialize};

use crate::face::{Expressions, FaceAnalysis, Gender};
use crate::geometry::{BoundingBox, ImageDimensions, Point};

/// Detection block wrapping the face box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

/// Analysis of the selected face, serialized as the response body.
///
/// Coordinates are relative to `image_dimensions`, the size of the decoded
/// upload. Callers rescale them against any display copy themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub age: u32,
    pub gender: Gender,
    pub gender_probability: f32,
    pub expressions: Expressions,
    pub detection: DetectionBox,
    pub landmarks: Vec<Point>,
    pub image_dimensions: ImageDimensions,
}

impl AnalysisResponse {
    /// Build the response for one face of an image of size `dims`.
    ///
    /// Non-finite numbers are written as `0` so the body never carries `null`
    /// where a number is expected.
    pub fn new(face: FaceAnalysis, dims: ImageDimensions) -> Self {
        let b = face.bounding_box;
        Self {
            age: round_age(face.age),
            gender: face.gender,
            gender_probability: unit_probability(face.gender_probability),
            expressions: face.expressions,
            detection: DetectionBox {
                bounding_box: BoundingBox::new(
                    finite_or_zero(b.x),
                    finite_or_zero(b.y),
                    finite_or_zero(b.width),
                    finite_or_zero(b.height),
                ),
            },
            landmarks: face
                .landmarks
                .into_iter()
                .map(|p| Point::new(finite_or_zero(p.x), finite_or_zero(p.y)))
                .collect(),
            image_dimensions: dims,
        }
    }

    /// Build the response from the first face in detection order.
    ///
    /// Returns `None` when nothing was detected.
    pub fn from_first(faces: Vec<FaceAnalysis>, dims: ImageDimensions) -> Option<Self> {
        faces.into_iter().next().map(|face| Self::new(face, dims))
    }

    /// Face bounding box.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.detection.bounding_box
    }

    /// First `n` landmarks, for diagnostics.
    pub fn landmark_sample(&self, n: usize) -> &[Point] {
        &self.landmarks[..n.min(self.landmarks.len())]
    }
}

/// Round an estimated age to the nearest non-negative whole year.
pub fn round_age(age: f32) -> u32 {
    if !age.is_finite() || age <= 0.0 {
        return 0;
    }
    age.round() as u32
}

/// Clamp a probability into `[0,1]`, mapping NaN to `0`.
pub fn unit_probability(p: f32) -> f32 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Error body returned on every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::LANDMARK_COUNT;

    fn face(x: f64, age: f32) -> FaceAnalysis {
        FaceAnalysis {
            score: 0.9,
            bounding_box: BoundingBox::new(x, 20.0, 100.0, 120.0),
            landmarks: (0..LANDMARK_COUNT)
                .map(|i| Point::new(x + i as f64, 30.0))
                .collect(),
            age,
            gender: Gender::Female,
            gender_probability: 0.93,
            expressions: Expressions::from_probabilities([0.8, 0.1, 0.02, 0.02, 0.02, 0.02, 0.02]),
        }
    }

    #[test]
    fn test_round_age() {
        assert_eq!(round_age(31.4), 31);
        assert_eq!(round_age(31.5), 32);
        assert_eq!(round_age(-3.0), 0);
        assert_eq!(round_age(f32::NAN), 0);
    }

    #[test]
    fn test_first_face_wins() {
        let dims = ImageDimensions::new(640, 480);
        let resp = AnalysisResponse::from_first(vec![face(10.0, 30.2), face(300.0, 50.0)], dims)
            .unwrap();
        assert_eq!(resp.bounding_box().x, 10.0);
        assert_eq!(resp.age, 30);
        assert_eq!(resp.image_dimensions, dims);
        assert!(AnalysisResponse::from_first(vec![], dims).is_none());
    }

    #[test]
    fn test_wire_shape() {
        let resp = AnalysisResponse::new(face(10.0, 30.0), ImageDimensions::new(640, 480));
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["gender"], "female");
        assert!(json["genderProbability"].is_number());
        assert_eq!(json["detection"]["box"]["x"], 10.0);
        assert_eq!(json["detection"]["box"]["height"], 120.0);
        assert_eq!(json["landmarks"].as_array().unwrap().len(), LANDMARK_COUNT);
        assert_eq!(json["imageDimensions"]["width"], 640);
        assert_eq!(json["imageDimensions"]["height"], 480);
        assert!(json["expressions"]["neutral"].is_number());
        assert!(json["age"].is_u64());
    }

    #[test]
    fn test_non_finite_values_serialize_as_numbers() {
        let mut f = face(10.0, 30.0);
        f.gender_probability = f32::NAN;
        f.landmarks[3] = Point::new(f64::NAN, f64::INFINITY);
        f.bounding_box.width = f64::NAN;

        let resp = AnalysisResponse::new(f, ImageDimensions::new(640, 480));
        assert_eq!(resp.gender_probability, 0.0);
        assert_eq!(resp.landmarks[3], Point::new(0.0, 0.0));
        assert_eq!(resp.bounding_box().width, 0.0);

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["genderProbability"].is_number());
        assert!(json["landmarks"][3]["x"].is_number());
        assert!(json["detection"]["box"]["width"].is_number());
    }

    #[test]
    fn test_unit_probability() {
        assert_eq!(unit_probability(1.7), 1.0);
        assert_eq!(unit_probability(-0.2), 0.0);
        assert_eq!(unit_probability(0.25), 0.25);
        assert_eq!(unit_probability(f32::NAN), 0.0);
    }

    #[test]
    fn test_landmark_sample() {
        let resp = AnalysisResponse::new(face(0.0, 30.0), ImageDimensions::new(10, 10));
        assert_eq!(resp.landmark_sample(5).len(), 5);
        assert_eq!(resp.landmark_sample(500).len(), LANDMARK_COUNT);
    }

    #[test]
    fn test_error_body_omits_missing_details() {
        let body = ErrorBody {
            error: "No image provided".to_string(),
            details: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"No image provided"}"#
        );
    }
}
