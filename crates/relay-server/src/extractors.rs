//! Custom Axum extractors for the relay.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// Proof that the request carried an accepted bearer key.
///
/// When no keys are configured every request passes.
#[derive(Debug, Clone, Copy)]
pub struct Authorized;

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.auth.is_enabled() {
            return Ok(Self);
        }

        let key = bearer_token(parts)?;
        if state.auth.accepts(key) {
            Ok(Self)
        } else {
            debug!("Rejected request with unknown API key");
            Err(ApiError::unauthorized("Invalid API key"))
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header"))?;

    let key = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization format. Expected: Bearer <token>"))?
        .trim();

    if key.is_empty() {
        return Err(ApiError::unauthorized("Empty API key"));
    }

    Ok(key)
}

/// JSON body extractor with OpenAI-style rejections
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {e}")))?;

        let value: T = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "JSON parse error");
            ApiError::bad_request(format!("Invalid JSON: {e}"))
        })?;

        Ok(Self(value))
    }
}
