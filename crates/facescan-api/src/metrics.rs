//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "facescan_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "facescan_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "facescan_http_requests_in_flight";

    // Analysis metrics
    pub const ANALYSES_TOTAL: &str = "facescan_analyses_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "facescan_analysis_duration_seconds";
    pub const FACES_DETECTED: &str = "facescan_faces_detected";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one analysis (decode + inference) and its outcome.
pub fn record_analysis(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::ANALYSES_TOTAL, &labels).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how many faces the analyzer returned for one image.
pub fn record_faces_detected(count: usize) {
    histogram!(names::FACES_DETECTED).record(count as f64);
}

/// Routes served by this API; anything else is collapsed into one label.
const KNOWN_PATHS: &[&str] = &["/predict_face", "/health", "/healthz", "/ready", "/metrics"];

/// Sanitize path for metrics labels (bounded cardinality).
fn sanitize_path(path: &str) -> String {
    static ID_SEGMENT: OnceLock<regex_lite::Regex> = OnceLock::new();

    if KNOWN_PATHS.contains(&path) {
        return path.to_string();
    }

    // Unknown paths are usually scanners; strip ids so they group together
    let id_segment = ID_SEGMENT.get_or_init(|| {
        regex_lite::Regex::new(r"/[0-9a-fA-F-]{8,}|/[0-9]+").expect("valid regex")
    });
    let path = id_segment.replace_all(path, "/:id");
    format!("unmatched:{}", path.split('/').take(3).collect::<Vec<_>>().join("/"))
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
