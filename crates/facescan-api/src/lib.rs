//! Axum HTTP server for face analysis.
//!
//! This crate provides:
//! - `POST /predict_face`: first-face analysis of an uploaded image
//! - Liveness/readiness probes
//! - Security headers, request ids and request logging
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
