//! Axum API server binary.
//!
//! Startup runs in two phases: every model is loaded first, and only then is
//! the listener bound. A model that fails to load stops the process.

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facescan_api::{create_router, metrics, ApiConfig, AppState};

const DEFAULT_LOG_FILTER: &str = "facescan_api=info,facescan_vision=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting facescan-api");

    let config = ApiConfig::from_env();
    info!(
        "API config: host={}, port={}, models={}",
        config.host,
        config.port,
        config.model_dir.display()
    );

    // Phase 1: provision models
    let state = match AppState::provision(config.clone()).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load face models: {}", e);
            std::process::exit(1);
        }
    };
    info!(models = ?state.analyzer.loaded_models(), "Face models ready");

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus recorder unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Phase 2: bind and serve
    let app = create_router(state, metrics_handle);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Face analysis server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
