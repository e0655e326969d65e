mod analyzer;
mod config;
mod error;
mod image;
mod middleware;
mod routes;
#[cfg(test)]
mod testing;

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analyzer::{AnswerModel, GeminiClient};
use crate::config::Config;
use crate::middleware::cors::route_cors;
use crate::middleware::panic::{health_panic_response, solve_panic_response};

/// Shared application state passed to all route handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub model: Arc<dyn AnswerModel>,
}

/// Build the HTTP surface: `/health`, `/solve`, `/solve/upload`.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let solve_cors = || route_cors(&config, [Method::POST, Method::OPTIONS]);

    // `get` would also answer HEAD; only GET and OPTIONS are served here.
    let health = get(routes::health::health)
        .head(routes::method_not_allowed)
        .options(routes::preflight)
        .fallback(routes::method_not_allowed)
        .layer::<_, Infallible>(CatchPanicLayer::custom(health_panic_response))
        .layer(route_cors(&config, [Method::GET, Method::OPTIONS]));

    let solve = post(routes::solve::solve)
        .options(routes::preflight)
        .fallback(routes::method_not_allowed)
        .layer::<_, Infallible>(CatchPanicLayer::custom(solve_panic_response))
        .layer(solve_cors());

    let upload = post(routes::solve::solve_upload)
        .options(routes::preflight)
        .fallback(routes::method_not_allowed)
        .layer::<_, Infallible>(CatchPanicLayer::custom(solve_panic_response))
        .layer(solve_cors());

    Router::new()
        .route("/health", health)
        .route("/solve", solve)
        .route("/solve/upload", upload)
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (.env is read here; ignored in production where env vars are set externally)
    let config = Config::from_env()?;

    // Initialize tracing (RUST_LOG wins over LOG_LEVEL)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Configuration loaded (model={}, port={})",
        config.model_name, config.port
    );

    let gemini = GeminiClient::new(&config)?;
    if !config.api_key_set() {
        warn!("GEMINI_API_KEY is not set: /health reports degraded and /solve returns 500");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        config: Arc::new(config),
        model: Arc::new(gemini),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Vibe Math proxy v{} listening on {}", routes::health::VERSION, addr);
    info!("Routes:");
    info!("  GET|OPTIONS  /health");
    info!("  POST|OPTIONS /solve");
    info!("  POST|OPTIONS /solve/upload");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
