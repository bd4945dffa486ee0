//! Conversion of raw model outputs into face attributes.

use facescan_models::{
    unit_probability, BoundingBox, Expressions, Gender, ImageDimensions, Point, LANDMARK_COUNT,
};

use crate::config::AnalyzerConfig;
use crate::error::{VisionError, VisionResult};
use crate::manifest::ModelKind;
use crate::preprocess::FaceCrop;

/// Turn detector outputs into face boxes in source pixels.
///
/// `boxes` holds `(ymin, xmin, ymax, xmax)` per candidate, normalized to the
/// padded square of side `side`. The result is ordered by descending score
/// after non-maximum suppression.
pub fn decode_detections(
    boxes: &[f32],
    scores: &[f32],
    side: f64,
    dims: ImageDimensions,
    config: &AnalyzerConfig,
) -> VisionResult<Vec<(BoundingBox, f32)>> {
    if boxes.len() != scores.len() * 4 {
        return Err(VisionError::unexpected_output(
            ModelKind::Detector,
            format!("{} box values for {} scores", boxes.len(), scores.len()),
        ));
    }

    let mut candidates: Vec<(BoundingBox, f32)> = boxes
        .chunks_exact(4)
        .zip(scores.iter().copied())
        .filter(|(_, score)| score.is_finite() && *score >= config.min_confidence)
        .map(|(b, score)| {
            let bbox = BoundingBox::from_corners(
                b[1] as f64 * side,
                b[0] as f64 * side,
                b[3] as f64 * side,
                b[2] as f64 * side,
            )
            .clip_to(dims);
            (bbox, score)
        })
        .filter(|(bbox, _)| bbox.is_valid())
        .collect();

    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(non_max_suppression(candidates, config.iou_threshold, config.max_faces))
}

/// Greedy NMS over score-sorted candidates.
pub fn non_max_suppression(
    sorted: Vec<(BoundingBox, f32)>,
    iou_threshold: f64,
    max_results: usize,
) -> Vec<(BoundingBox, f32)> {
    let mut kept: Vec<(BoundingBox, f32)> = Vec::new();
    for (bbox, score) in sorted {
        if kept.len() >= max_results {
            break;
        }
        if kept.iter().all(|(k, _)| k.iou(&bbox) <= iou_threshold) {
            kept.push((bbox, score));
        }
    }
    kept
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|v| v / sum).collect()
}

/// Interpret a classifier head as probabilities.
///
/// Exports that already end in a softmax are passed through; raw logits are
/// normalized.
pub fn to_probabilities(values: &[f32]) -> Vec<f32> {
    let in_range = values.iter().all(|v| (0.0..=1.0).contains(v));
    let sum: f32 = values.iter().sum();
    if in_range && (sum - 1.0).abs() < 1e-3 {
        values.to_vec()
    } else {
        softmax(values)
    }
}

/// Map the landmark head output into source pixels.
pub fn landmarks_from_output(raw: &[f32], crop: &FaceCrop) -> VisionResult<Vec<Point>> {
    if raw.len() != LANDMARK_COUNT * 2 {
        return Err(VisionError::unexpected_output(
            ModelKind::Landmarks68,
            format!("expected {} values, got {}", LANDMARK_COUNT * 2, raw.len()),
        ));
    }

    Ok(raw
        .chunks_exact(2)
        .map(|xy| crop.to_image_coords(xy[0], xy[1]))
        .collect())
}

/// Expression probabilities from the classifier head.
pub fn expressions_from_output(raw: &[f32]) -> VisionResult<Expressions> {
    let probs: [f32; 7] = to_probabilities(raw).try_into().map_err(|v: Vec<f32>| {
        VisionError::unexpected_output(
            ModelKind::Expressions,
            format!("expected 7 classes, got {}", v.len()),
        )
    })?;
    Ok(Expressions::from_probabilities(probs))
}

/// Gender label and its probability from the gender head.
pub fn gender_from_output(raw: &[f32]) -> VisionResult<(Gender, f32)> {
    if raw.len() != Gender::ALL.len() {
        return Err(VisionError::unexpected_output(
            ModelKind::AgeGender,
            format!("expected {} gender classes, got {}", Gender::ALL.len(), raw.len()),
        ));
    }

    let probs = to_probabilities(raw);
    let (idx, prob) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
    Ok((Gender::ALL[idx], unit_probability(prob)))
}

/// Estimated age from the age head.
pub fn age_from_output(raw: &[f32]) -> VisionResult<f32> {
    match raw.first() {
        Some(age) if age.is_finite() => Ok(age.max(0.0)),
        Some(age) => Err(VisionError::unexpected_output(
            ModelKind::AgeGender,
            format!("non-finite age {age}"),
        )),
        None => Err(VisionError::unexpected_output(
            ModelKind::AgeGender,
            "empty age output",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::InputTensor;

    fn config() -> AnalyzerConfig {
        AnalyzerConfig::default()
    }

    #[test]
    fn test_decode_detections_scales_and_orders() {
        let dims = ImageDimensions::new(400, 200);
        // (ymin, xmin, ymax, xmax) on a 400px square
        let boxes = [
            0.125, 0.125, 0.375, 0.25, // low score
            0.0, 0.5, 0.25, 0.75, // high score
            0.5, 0.5, 0.9, 0.9, // below threshold
        ];
        let scores = [0.6, 0.95, 0.2];

        let faces = decode_detections(&boxes, &scores, 400.0, dims, &config()).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].1, 0.95);
        assert_eq!(faces[0].0, BoundingBox::new(200.0, 0.0, 100.0, 100.0));
        assert_eq!(faces[1].0, BoundingBox::new(50.0, 50.0, 50.0, 100.0));
    }

    #[test]
    fn test_decode_detections_clips_to_image() {
        let dims = ImageDimensions::new(400, 200);
        // extends into the padding below the image
        let faces = decode_detections(&[0.375, 0.0, 0.625, 0.125], &[0.9], 400.0, dims, &config()).unwrap();
        assert_eq!(faces[0].0, BoundingBox::new(0.0, 150.0, 50.0, 50.0));
    }

    #[test]
    fn test_decode_detections_shape_mismatch() {
        let dims = ImageDimensions::new(10, 10);
        assert!(decode_detections(&[0.0; 7], &[0.9, 0.8], 10.0, dims, &config()).is_err());
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(1.0, 1.0, 10.0, 10.0);
        let c = BoundingBox::new(50.0, 50.0, 10.0, 10.0);
        let kept = non_max_suppression(vec![(a, 0.9), (b, 0.8), (c, 0.7)], 0.5, 10);
        assert_eq!(kept, vec![(a, 0.9), (c, 0.7)]);

        let capped = non_max_suppression(vec![(a, 0.9), (c, 0.7)], 0.5, 1);
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_softmax_and_passthrough() {
        let p = softmax(&[1.0, 1.0]);
        assert!((p[0] - 0.5).abs() < 1e-6);

        let already = [0.25, 0.75];
        assert_eq!(to_probabilities(&already), already.to_vec());

        let logits = to_probabilities(&[2.0, -1.0, 0.5]);
        assert!((logits.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(logits.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_landmarks_mapping() {
        let crop = FaceCrop {
            tensor: InputTensor {
                shape: [1, 3, 1, 1],
                data: vec![0.0; 3],
            },
            origin: Point::new(10.0, 20.0),
            side: 100.0,
        };
        let raw: Vec<f32> = (0..LANDMARK_COUNT).flat_map(|_| [0.5, 0.25]).collect();
        let points = landmarks_from_output(&raw, &crop).unwrap();
        assert_eq!(points.len(), LANDMARK_COUNT);
        assert_eq!(points[0], Point::new(60.0, 45.0));

        assert!(landmarks_from_output(&raw[..10], &crop).is_err());
    }

    #[test]
    fn test_gender_and_age() {
        let (gender, p) = gender_from_output(&[0.1, 0.9]).unwrap();
        assert_eq!(gender, Gender::Female);
        assert!((p - 0.9).abs() < 1e-6);

        let (gender, p) = gender_from_output(&[3.0, -3.0]).unwrap();
        assert_eq!(gender, Gender::Male);
        assert!(p > 0.99 && p <= 1.0);

        assert!(gender_from_output(&[1.0]).is_err());
        assert_eq!(age_from_output(&[33.7]).unwrap(), 33.7);
        assert_eq!(age_from_output(&[-2.0]).unwrap(), 0.0);
        assert!(age_from_output(&[]).is_err());
    }

    #[test]
    fn test_expressions_from_logits() {
        let e = expressions_from_output(&[0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(e.dominant().0, "happy");
        assert!(expressions_from_output(&[0.5, 0.5]).is_err());
    }
}
