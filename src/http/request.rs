//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Read and size-limit JSON request bodies
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body limit enforced while reading, before any parsing

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use serde::de::DeserializeOwned;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates `x-request-id` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of a request, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Why a JSON body could not be read.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("failed to read body: {0}")]
    Read(#[from] axum::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Read at most `limit` bytes and deserialize them as JSON.
pub async fn read_json<T: DeserializeOwned>(request: Request<Body>, limit: usize) -> Result<T, BodyError> {
    let bytes = axum::body::to_bytes(request.into_body(), limit).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
