//! Route definitions for the relay API.

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // OpenAI-compatible endpoints
        .nest("/v1", openai_routes())
        // Admin endpoints
        .nest("/admin", admin_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// OpenAI-compatible API routes
fn openai_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/completions", post(handlers::chat_completion))
        .route("/models", get(handlers::list_models))
}

/// Admin routes
fn admin_routes() -> Router<AppState> {
    Router::new().route("/credentials/reload", post(handlers::reload_credentials))
}

/// Any origin, the methods and headers an OpenAI client sends
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
