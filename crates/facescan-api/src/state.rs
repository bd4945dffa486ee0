//! Application state.

use std::sync::Arc;

use facescan_vision::{AnalyzerConfig, FaceAnalyzer, ModelManifest, OrtFaceAnalyzer, VisionResult};

use crate::config::ApiConfig;

/// Shared application state.
///
/// The analyzer is built once before the listener starts and is read-only
/// afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub analyzer: Arc<dyn FaceAnalyzer>,
}

impl AppState {
    /// Create state around an already-provisioned analyzer.
    pub fn new(config: ApiConfig, analyzer: Arc<dyn FaceAnalyzer>) -> Self {
        Self { config, analyzer }
    }

    /// Load every model from the configured directory and build the state.
    pub async fn provision(config: ApiConfig) -> VisionResult<Self> {
        let manifest = ModelManifest::new(&config.model_dir);
        let analyzer_config = AnalyzerConfig::default().with_min_confidence(config.min_confidence);
        let analyzer = OrtFaceAnalyzer::load(&manifest, analyzer_config).await?;
        Ok(Self::new(config, Arc::new(analyzer)))
    }
}
