//! Model artifacts required by the face analysis capability.
//!
//! All models are ONNX exports stored side by side in one directory:
//!
//! ```text
//! models/
//!   ssd_mobilenetv1.onnx      face detector
//!   face_landmark_68.onnx     68-point landmark regressor
//!   face_recognition.onnx     recognition embedder (loaded, not queried)
//!   face_expression.onnx      expression classifier
//!   age_gender.onnx           age regressor + gender classifier
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

/// One of the pretrained models the capability loads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Detector,
    Landmarks68,
    Recognition,
    Expressions,
    AgeGender,
}

impl ModelKind {
    /// All models, in load order.
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Detector,
        ModelKind::Landmarks68,
        ModelKind::Recognition,
        ModelKind::Expressions,
        ModelKind::AgeGender,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Detector => "ssd_mobilenetv1",
            ModelKind::Landmarks68 => "face_landmark_68",
            ModelKind::Recognition => "face_recognition",
            ModelKind::Expressions => "face_expression",
            ModelKind::AgeGender => "age_gender",
        }
    }

    /// File name inside the model directory.
    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.as_str())
    }

    /// Named outputs read from this model.
    pub fn output_names(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Detector => &["boxes", "scores"],
            ModelKind::Landmarks68 => &["landmarks"],
            ModelKind::Recognition => &["embedding"],
            ModelKind::Expressions => &["expressions"],
            ModelKind::AgeGender => &["age", "gender"],
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location of the model artifacts on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelManifest {
    dir: PathBuf,
}

impl ModelManifest {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a model file.
    pub fn path_for(&self, kind: ModelKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Models whose file does not exist.
    pub fn missing(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|kind| !self.path_for(*kind).is_file())
            .collect()
    }
}

/// `models/` next to the running executable, or `./models` if the
/// executable location cannot be resolved.
pub fn default_model_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
        .unwrap_or_else(|| PathBuf::from("models"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(ModelKind::Detector.file_name(), "ssd_mobilenetv1.onnx");
        assert_eq!(ModelKind::AgeGender.file_name(), "age_gender.onnx");
        assert_eq!(ModelKind::ALL.len(), 5);
    }

    #[test]
    fn test_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ModelManifest::new(dir.path());
        assert_eq!(manifest.missing(), ModelKind::ALL.to_vec());

        std::fs::write(manifest.path_for(ModelKind::Detector), b"stub").unwrap();
        let missing = manifest.missing();
        assert_eq!(missing.len(), 4);
        assert!(!missing.contains(&ModelKind::Detector));
    }

    #[test]
    fn test_default_dir_ends_with_models() {
        assert!(default_model_dir().ends_with("models"));
    }
}
