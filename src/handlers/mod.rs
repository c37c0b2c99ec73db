//! HTTP surface.

pub mod ask;
pub mod health;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::AppState;

/// Build the application router with tracing and CORS layers.
pub fn create_router(state: AppState, config: &AppConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    info!(origins = ?config.origins(), "CORS enabled");

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health::root))
        .route("/docs", get(health::docs))
        .route("/health", get(health::health_check))
        .route("/ask", post(ask::ask_question))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
