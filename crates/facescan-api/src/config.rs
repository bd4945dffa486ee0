//! API configuration.

use std::path::PathBuf;

use facescan_vision::default_model_dir;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory holding the ONNX model files
    pub model_dir: PathBuf,
    /// Max request body size
    pub max_body_size: usize,
    /// Minimum detector score for a face to count
    pub min_confidence: f32,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            model_dir: default_model_dir(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            min_confidence: 0.5,
            cors_origins: vec!["*".to_string()],
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("API_HOST").unwrap_or(defaults.host),
            port: lookup("API_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            model_dir: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            max_body_size: lookup("MAX_BODY_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            min_confidence: lookup("MIN_CONFIDENCE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_confidence),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            metrics_enabled: lookup("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Address to bind, as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
