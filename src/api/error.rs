use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::feed::{ListError, RenderError};

/// Request failures that reach the client.
///
/// Every variant maps to `400 Bad Request` with a fixed reason string; the
/// underlying cause is only logged. Per-feed fetch failures never show up
/// here because they degrade to empty feeds.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing feed source")]
    MissingSource,

    #[error("invalid source URL")]
    InvalidSource(String),

    #[error("failed to fetch source list")]
    SourceList(#[from] ListError),

    #[error("failed to build merged feed")]
    Render(#[from] RenderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::MissingSource => {
                tracing::debug!("Request without source parameter");
            }
            ApiError::InvalidSource(detail) => {
                tracing::debug!(detail = %detail, "Rejected source parameter");
            }
            ApiError::SourceList(e) => {
                tracing::warn!(error = %e, "Failed to resolve feed list");
            }
            ApiError::Render(e) => {
                tracing::error!(error = %e, "Failed to serialize merged feed");
            }
        }
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
