//! Response rendering.
//!
//! # Responsibilities
//! - Turn handler output into wire responses
//! - Map handler errors to status codes with plain-text bodies
//!
//! # Design Decisions
//! - The listing always carries `ETag` and `Cache-Control: no-store`
//! - Errors without a specific status become 500 with their description

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use thiserror::Error;

use crate::store::{Snapshot, Talk, ValidationError};

/// Successful handler output.
#[derive(Debug)]
pub enum Reply {
    /// Full listing with its version tag.
    Listing(Arc<Snapshot>),
    Talk(Talk),
    NoContent,
    NotModified,
}

/// Handler failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn no_talk(title: &str) -> Self {
        ApiError::NotFound(format!("No talk \"{title}\" found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type HandlerResult = Result<Reply, ApiError>;

/// Quoted version tag, e.g. `"3"`.
pub fn etag(version: u64) -> String {
    format!("\"{version}\"")
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Listing(snapshot) => (
                [
                    (header::ETAG, etag(snapshot.version)),
                    (header::CACHE_CONTROL, "no-store".to_string()),
                ],
                Json(&snapshot.talks),
            )
                .into_response(),
            Reply::Talk(talk) => Json(talk).into_response(),
            Reply::NoContent => StatusCode::NO_CONTENT.into_response(),
            Reply::NotModified => StatusCode::NOT_MODIFIED.into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// The page served when neither a route nor a static file matched.
pub fn not_found_page() -> Response {
    (StatusCode::NOT_FOUND, Html("<h1>Not Found</h1>")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_headers() {
        let snapshot = Arc::new(Snapshot {
            version: 4,
            talks: vec![],
        });
        let response = Reply::Listing(snapshot).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ETAG], "\"4\"");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_error_statuses() {
        let err: ApiError = ValidationError::talk("presenter missing").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Bad talk data: presenter missing");
        assert_eq!(ApiError::no_talk("T").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::no_talk("T").to_string(), "No talk \"T\" found");
        assert_eq!(
            ApiError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_modified_has_no_body_headers() {
        let response = Reply::NotModified.into_response();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.headers().get(header::ETAG).is_none());
    }
}
