//! HTTP request handlers for the relay API.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use relay_core::{ChatCompletionRequest, ModelsResponse};
use serde::Serialize;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    dispatcher::Dispatched,
    error::ApiError,
    extractors::{Authorized, JsonBody},
    state::AppState,
};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// List models endpoint (OpenAI compatible)
#[instrument(skip(state))]
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse::new(state.model_objects()))
}

/// Chat completion endpoint (OpenAI compatible)
#[instrument(skip_all, fields(model = %request.model, stream = request.stream))]
pub async fn chat_completion(
    State(state): State<AppState>,
    _auth: Authorized,
    JsonBody(request): JsonBody<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let dispatched = state
        .dispatcher
        .dispatch(request, CancellationToken::new())
        .await?;

    match dispatched {
        Dispatched::Complete(completion) => Ok(Json(completion).into_response()),
        Dispatched::Stream(frames) => Ok(event_stream(frames)),
    }
}

fn event_stream(frames: futures::stream::BoxStream<'static, bytes::Bytes>) -> Response {
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// Credential reload response
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    /// Credentials now in the pool
    pub loaded: usize,
}

/// Reload the credential pool from its source
#[instrument(skip_all)]
pub async fn reload_credentials(
    State(state): State<AppState>,
    _auth: Authorized,
) -> Result<Json<ReloadResponse>, ApiError> {
    let loaded = state.pool().reload().await?;
    info!(loaded = loaded, "Credential pool reloaded");
    Ok(Json(ReloadResponse { loaded }))
}
