//! Face prediction handler.
//!
//! `POST /predict_face` takes a multipart upload with an `image` part,
//! decodes it, runs the face analyzer on the full-size image and returns the
//! first detected face.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use facescan_models::AnalysisResponse;
use facescan_vision::{decode_image, FaceAnalyzer};
use tracing::{debug, error, info};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Name of the multipart part carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Number of landmarks included in the diagnostic log line.
const LANDMARK_LOG_SAMPLE: usize = 5;

/// Analyze the uploaded image and return its first face.
pub async fn predict_face(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let Ok(multipart) = multipart else {
        return Err(ApiError::NoImage);
    };
    let upload = read_image_field(multipart).await?.ok_or(ApiError::NoImage)?;
    debug!(bytes = upload.len(), "Image received");

    let analyzer = Arc::clone(&state.analyzer);
    let start = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || analyze_upload(analyzer.as_ref(), &upload))
        .await
        .unwrap_or_else(|e| {
            let details = if e.is_panic() {
                panic_message(e.into_panic())
            } else {
                e.to_string()
            };
            Err(ApiError::analysis_failed(details))
        });
    metrics::record_analysis(outcome_label(&outcome), start.elapsed().as_secs_f64());

    match outcome {
        Ok(response) => {
            info!(
                dimensions = ?response.image_dimensions,
                bounding_box = ?response.bounding_box(),
                landmarks = ?response.landmark_sample(LANDMARK_LOG_SAMPLE),
                expression = response.expressions.dominant().0,
                "Face analyzed"
            );
            Ok(Json(response))
        }
        Err(ApiError::AnalysisFailed(details)) => {
            error!(error = %details, "Face analysis error");
            Err(ApiError::AnalysisFailed(details))
        }
        Err(e) => Err(e),
    }
}

/// Decode the upload and analyze it, keeping the first face.
///
/// Runs on the blocking pool: both decoding and inference are CPU-bound.
pub fn analyze_upload(analyzer: &dyn FaceAnalyzer, bytes: &[u8]) -> ApiResult<AnalysisResponse> {
    let image = decode_image(bytes)?;
    let dims = image.dimensions();

    let faces = analyzer.detect_all(&image)?;
    metrics::record_faces_detected(faces.len());
    debug!(faces = faces.len(), dimensions = %dims, "Detection complete");

    AnalysisResponse::from_first(faces, dims).ok_or(ApiError::NoFace)
}

/// Pull the bytes of the `image` part, skipping any other parts.
async fn read_image_field(mut multipart: Multipart) -> ApiResult<Option<Bytes>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            return Ok(Some(field.bytes().await?));
        }
    }
    Ok(None)
}

fn outcome_label(outcome: &ApiResult<AnalysisResponse>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(ApiError::NoFace) => "no_face",
        Err(_) => "failed",
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("analysis panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("analysis panicked: {msg}")
    } else {
        "analysis panicked".to_string()
    }
}
