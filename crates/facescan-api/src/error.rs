//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facescan_models::ErrorBody;
use facescan_vision::VisionError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image provided")]
    NoImage,

    #[error("No face detected")]
    NoFace,

    #[error("Face analysis failed")]
    AnalysisFailed(String),

    #[error("Image too large")]
    PayloadTooLarge(String),

    #[error("Invalid multipart body")]
    InvalidUpload(String),
}

impl ApiError {
    pub fn analysis_failed(details: impl Into<String>) -> Self {
        Self::AnalysisFailed(details.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoImage | ApiError::NoFace | ApiError::InvalidUpload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::AnalysisFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::AnalysisFailed(details)
            | ApiError::PayloadTooLarge(details)
            | ApiError::InvalidUpload(details) => Some(details.clone()),
            _ => None,
        }
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        ApiError::AnalysisFailed(err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::InvalidUpload(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facescan_vision::ModelKind;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors() {
        let (status, body) = body_of(ApiError::NoImage).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "No image provided"}));

        let (status, body) = body_of(ApiError::NoFace).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "No face detected"}));
    }

    #[tokio::test]
    async fn test_analysis_failure_carries_details() {
        let err: ApiError = VisionError::inference(ModelKind::Detector, "boom").into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Face analysis failed");
        assert_eq!(body["details"], "ssd_mobilenetv1 inference failed: boom");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::PayloadTooLarge("limit".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_invalid_upload_uses_fixed_reason() {
        let (status, body) = body_of(ApiError::InvalidUpload("incomplete field data".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid multipart body");
        assert_eq!(body["details"], "incomplete field data");
    }
}
