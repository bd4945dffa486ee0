//! ONNX Runtime implementation of [`FaceAnalyzer`].
//!
//! Inference per image:
//! 1. SSD detector on the padded, resized image
//! 2. score threshold + NMS, boxes mapped back to source pixels
//! 3. per face: landmarks, expressions and age/gender on a 112x112 crop
//!
//! The recognition embedder is loaded with the rest of the models but is
//! never queried here.
//!
//! `Session::run` needs exclusive access, so each session sits behind its
//! own mutex. Concurrent requests serialize per model, not globally.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use facescan_models::FaceAnalysis;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analyzer::FaceAnalyzer;
use crate::config::AnalyzerConfig;
use crate::decode::DecodedImage;
use crate::error::{VisionError, VisionResult};
use crate::manifest::{ModelKind, ModelManifest};
use crate::postprocess::{
    age_from_output, decode_detections, expressions_from_output, gender_from_output,
    landmarks_from_output,
};
use crate::preprocess::{detector_input, face_crop, InputTensor};

/// A loaded model session.
struct ModelSession {
    kind: ModelKind,
    session: Mutex<Session>,
}

impl ModelSession {
    fn load(kind: ModelKind, model_path: &Path) -> VisionResult<Self> {
        if !model_path.is_file() {
            return Err(VisionError::ModelNotFound(model_path.to_path_buf()));
        }

        let model_bytes = std::fs::read(model_path)
            .map_err(|e| VisionError::model_load(kind, format!("read model file: {e}")))?;

        let session = Session::builder()
            .map_err(|e| VisionError::model_load(kind, format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::model_load(kind, format!("opt level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| VisionError::model_load(kind, e.to_string()))?;

        debug!(model = %kind, path = %model_path.display(), "Model loaded");

        Ok(Self {
            kind,
            session: Mutex::new(session),
        })
    }

    /// Run the model on one tensor and copy out the named outputs.
    fn run(&self, input: InputTensor) -> VisionResult<Vec<Vec<f32>>> {
        let kind = self.kind;
        let tensor = Tensor::from_array((input.shape.to_vec(), input.data.into_boxed_slice()))
            .map(DynValue::from)
            .map_err(|e| VisionError::inference(kind, format!("tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference(kind, "session poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| VisionError::inference(kind, e.to_string()))?;

        kind.output_names()
            .iter()
            .map(|name| {
                let value = outputs.get(*name).ok_or_else(|| {
                    VisionError::unexpected_output(kind, format!("missing output '{name}'"))
                })?;
                let (_, data) = value
                    .try_extract_tensor::<f32>()
                    .map_err(|e| VisionError::unexpected_output(kind, format!("{name}: {e}")))?;
                Ok(data.to_vec())
            })
            .collect()
    }
}

/// Face analyzer backed by five ONNX models.
pub struct OrtFaceAnalyzer {
    config: AnalyzerConfig,
    detector: ModelSession,
    landmarks: ModelSession,
    recognition: ModelSession,
    expressions: ModelSession,
    age_gender: ModelSession,
}

impl OrtFaceAnalyzer {
    /// Load every model from `manifest` in parallel.
    ///
    /// Fails on the first model that is missing or cannot be loaded. There is
    /// no retry.
    pub async fn load(manifest: &ModelManifest, config: AnalyzerConfig) -> VisionResult<Self> {
        let start = Instant::now();
        info!(dir = %manifest.dir().display(), "Loading face models");

        let missing = manifest.missing();
        if !missing.is_empty() {
            warn!(?missing, "Model files not found");
        }

        let spawn = |kind: ModelKind| -> JoinHandle<VisionResult<ModelSession>> {
            let path = manifest.path_for(kind);
            tokio::task::spawn_blocking(move || ModelSession::load(kind, &path))
        };

        let (detector, landmarks, recognition, expressions, age_gender) = tokio::try_join!(
            join_load(spawn(ModelKind::Detector)),
            join_load(spawn(ModelKind::Landmarks68)),
            join_load(spawn(ModelKind::Recognition)),
            join_load(spawn(ModelKind::Expressions)),
            join_load(spawn(ModelKind::AgeGender)),
        )?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Face models loaded"
        );

        Ok(Self {
            config,
            detector,
            landmarks,
            recognition,
            expressions,
            age_gender,
        })
    }
}

async fn join_load(handle: JoinHandle<VisionResult<ModelSession>>) -> VisionResult<ModelSession> {
    handle
        .await
        .map_err(|e| VisionError::internal(format!("model loader task failed: {e}")))?
}

impl FaceAnalyzer for OrtFaceAnalyzer {
    fn detect_all(&self, image: &DecodedImage) -> VisionResult<Vec<FaceAnalysis>> {
        let dims = image.dimensions();
        let input = detector_input(image);
        let side = input.side;

        let outputs = self.detector.run(input.tensor)?;
        let [boxes, scores] = outputs.as_slice() else {
            return Err(VisionError::unexpected_output(
                ModelKind::Detector,
                "expected boxes and scores",
            ));
        };
        let detections = decode_detections(boxes, scores, side, dims, &self.config)?;
        debug!(faces = detections.len(), image = %dims, "Detector finished");

        let mut faces = Vec::with_capacity(detections.len());
        for (bbox, score) in detections {
            let Some(crop) = face_crop(image, &bbox) else {
                continue;
            };

            let landmarks = {
                let out = self.landmarks.run(crop.tensor.clone())?;
                landmarks_from_output(first_output(&out, ModelKind::Landmarks68)?, &crop)?
            };

            let expressions = {
                let out = self.expressions.run(crop.tensor.clone())?;
                expressions_from_output(first_output(&out, ModelKind::Expressions)?)?
            };

            let (age, gender, gender_probability) = {
                let out = self.age_gender.run(crop.tensor)?;
                let [age, gender] = out.as_slice() else {
                    return Err(VisionError::unexpected_output(
                        ModelKind::AgeGender,
                        "expected age and gender",
                    ));
                };
                let (gender, probability) = gender_from_output(gender)?;
                (age_from_output(age)?, gender, probability)
            };

            faces.push(FaceAnalysis {
                score,
                bounding_box: bbox,
                landmarks,
                age,
                gender,
                gender_probability,
                expressions,
            });
        }

        Ok(faces)
    }

    fn loaded_models(&self) -> Vec<String> {
        [
            &self.detector,
            &self.landmarks,
            &self.recognition,
            &self.expressions,
            &self.age_gender,
        ]
        .iter()
        .map(|m| m.kind.to_string())
        .collect()
    }
}

fn first_output(outputs: &[Vec<f32>], kind: ModelKind) -> VisionResult<&[f32]> {
    outputs
        .first()
        .map(Vec::as_slice)
        .ok_or_else(|| VisionError::unexpected_output(kind, "no outputs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_fails_when_models_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ModelManifest::new(dir.path());

        let err = OrtFaceAnalyzer::load(&manifest, AnalyzerConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, VisionError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_models() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ModelManifest::new(dir.path());
        for kind in ModelKind::ALL {
            std::fs::write(manifest.path_for(kind), b"not an onnx graph").unwrap();
        }

        let err = OrtFaceAnalyzer::load(&manifest, AnalyzerConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, VisionError::ModelLoad { .. }));
    }
}
