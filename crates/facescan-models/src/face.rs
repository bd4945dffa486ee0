//! Per-face analysis results produced by the detection capability.
//!
//! A [`FaceAnalysis`] carries everything the capability reports for one face:
//! - bounding box and 68-point landmarks in source-pixel coordinates
//! - estimated age (unrounded) and gender with its probability
//! - expression probabilities

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::{BoundingBox, Point};

/// Number of points in the 68-point landmark scheme.
pub const LANDMARK_COUNT: usize = 68;

/// Gender label reported by the age/gender estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Labels in the order of the estimator's gender output.
    pub const ALL: &'static [Gender] = &[Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expression probabilities, one per emotion category.
///
/// Field order matches the classifier's output order and is preserved when
/// serialized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Expressions {
    pub neutral: f32,
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub fearful: f32,
    pub disgusted: f32,
    pub surprised: f32,
}

impl Expressions {
    /// Category names in classifier output order.
    pub const LABELS: [&'static str; 7] = [
        "neutral",
        "happy",
        "sad",
        "angry",
        "fearful",
        "disgusted",
        "surprised",
    ];

    /// Build from probabilities in classifier output order, clamped to `[0,1]`.
    pub fn from_probabilities(probs: [f32; 7]) -> Self {
        let p = probs.map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 });
        Self {
            neutral: p[0],
            happy: p[1],
            sad: p[2],
            angry: p[3],
            fearful: p[4],
            disgusted: p[5],
            surprised: p[6],
        }
    }

    /// Probabilities in classifier output order.
    pub fn as_array(&self) -> [f32; 7] {
        [
            self.neutral,
            self.happy,
            self.sad,
            self.angry,
            self.fearful,
            self.disgusted,
            self.surprised,
        ]
    }

    /// Iterate `(name, probability)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> {
        Self::LABELS.into_iter().zip(self.as_array())
    }

    /// The most probable expression.
    pub fn dominant(&self) -> (&'static str, f32) {
        self.iter()
            .fold(("neutral", f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best })
    }
}

/// Full analysis of one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAnalysis {
    /// Detector confidence for this face.
    pub score: f32,
    pub bounding_box: BoundingBox,
    /// Ordered landmark points ([`LANDMARK_COUNT`] entries).
    pub landmarks: Vec<Point>,
    /// Estimated age in years, unrounded.
    pub age: f32,
    pub gender: Gender,
    pub gender_probability: f32,
    pub expressions: Expressions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_labels() {
        assert_eq!(Gender::Male.to_string(), "male");
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
        assert_eq!(
            serde_json::from_str::<Gender>("\"male\"").unwrap(),
            Gender::Male
        );
    }

    #[test]
    fn test_expressions_clamped() {
        let e = Expressions::from_probabilities([1.2, -0.1, 0.5, f32::NAN, 0.0, 0.0, 0.0]);
        assert_eq!(e.neutral, 1.0);
        assert_eq!(e.happy, 0.0);
        assert_eq!(e.sad, 0.5);
        assert_eq!(e.angry, 0.0);
    }

    #[test]
    fn test_expressions_dominant() {
        let e = Expressions::from_probabilities([0.1, 0.7, 0.05, 0.05, 0.05, 0.03, 0.02]);
        assert_eq!(e.dominant().0, "happy");
    }

    #[test]
    fn test_expressions_serialize_in_label_order() {
        let e = Expressions::from_probabilities([0.0; 7]);
        let json = serde_json::to_string(&e).unwrap();
        let positions: Vec<usize> = Expressions::LABELS
            .iter()
            .map(|l| json.find(&format!("\"{l}\"")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
