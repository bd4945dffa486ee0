//! Error types for vision operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::manifest::ModelKind;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while decoding images or running face models.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Unsupported or corrupt image: {0}")]
    Decode(String),

    #[error("Decoded image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load {model} model: {message}")]
    ModelLoad { model: ModelKind, message: String },

    #[error("{model} inference failed: {message}")]
    Inference { model: ModelKind, message: String },

    #[error("Unexpected {model} output: {message}")]
    UnexpectedOutput { model: ModelKind, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisionError {
    /// Create a decode failure error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a model load failure error.
    pub fn model_load(model: ModelKind, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            model,
            message: message.into(),
        }
    }

    /// Create an inference failure error.
    pub fn inference(model: ModelKind, message: impl Into<String>) -> Self {
        Self::Inference {
            model,
            message: message.into(),
        }
    }

    /// Create an unexpected output error.
    pub fn unexpected_output(model: ModelKind, message: impl Into<String>) -> Self {
        Self::UnexpectedOutput {
            model,
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = VisionError::inference(ModelKind::Landmarks68, "bad shape");
        assert_eq!(err.to_string(), "face_landmark_68 inference failed: bad shape");

        let err = VisionError::EmptyImage { width: 0, height: 10 };
        assert_eq!(err.to_string(), "Decoded image is empty (0x10)");
    }

    #[test]
    fn test_model_errors_name_the_model() {
        let err = VisionError::model_load(ModelKind::Detector, "corrupt");
        assert_eq!(err.to_string(), "Failed to load ssd_mobilenetv1 model: corrupt");

        let err = VisionError::ModelNotFound(PathBuf::from("models/age_gender.onnx"));
        assert_eq!(err.to_string(), "Model file not found: models/age_gender.onnx");
    }
}
