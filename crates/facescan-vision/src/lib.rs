//! Image decoding and face analysis for the FaceScan service.
//!
//! This crate provides:
//! - Decoding of uploaded bytes into RGB pixel buffers
//! - The [`FaceAnalyzer`] capability trait
//! - An ONNX Runtime implementation backed by five pretrained models
//! - Model provisioning from a directory at startup

pub mod analyzer;
pub mod config;
pub mod decode;
pub mod error;
pub mod manifest;
pub mod ort_backend;
pub mod postprocess;
pub mod preprocess;

pub use analyzer::FaceAnalyzer;
pub use config::AnalyzerConfig;
pub use decode::{decode_image, DecodedImage};
pub use error::{VisionError, VisionResult};
pub use manifest::{default_model_dir, ModelKind, ModelManifest};
pub use ort_backend::OrtFaceAnalyzer;
