use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::analyzer::UpstreamError;

/// JSON body for every failed solve request.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Everything that can end a solve request early.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("Image must be a non-empty string")]
    MissingImage,

    #[error("Image file must not be empty")]
    MissingFile,

    #[error("{message}")]
    MalformedBody { status: StatusCode, message: String },

    #[error("Invalid image data provided")]
    InvalidImage,

    #[error("API key not configured")]
    MissingApiKey,

    #[error("Invalid API key configuration")]
    UpstreamAuth,

    #[error("Rate limit exceeded. Please try again later.")]
    UpstreamRateLimit,

    #[error("Service temporarily unavailable. Please try again later.")]
    UpstreamUnavailable,

    #[error("Internal server error: {0}")]
    UpstreamUnknown(String),

    #[error("An unexpected error occurred")]
    Unexpected,
}

impl SolveError {
    /// Classify an upstream failure. Typed variants map directly; untyped
    /// messages fall back to keyword inspection.
    pub fn from_upstream(err: UpstreamError) -> Self {
        match err {
            UpstreamError::InvalidCredentials(_) => SolveError::UpstreamAuth,
            UpstreamError::RateLimited(_) => SolveError::UpstreamRateLimit,
            UpstreamError::Unavailable(_) => SolveError::UpstreamUnavailable,
            UpstreamError::EmptyResponse => {
                SolveError::UpstreamUnknown(UpstreamError::EmptyResponse.to_string())
            }
            UpstreamError::Other(message) => classify_message(message),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SolveError::MissingImage | SolveError::MissingFile | SolveError::InvalidImage => {
                StatusCode::BAD_REQUEST
            }
            SolveError::MalformedBody { status, .. } => *status,
            SolveError::UpstreamRateLimit => StatusCode::TOO_MANY_REQUESTS,
            SolveError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            SolveError::MissingApiKey
            | SolveError::UpstreamAuth
            | SolveError::UpstreamUnknown(_)
            | SolveError::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SolveError::MissingImage
            | SolveError::MissingFile
            | SolveError::MalformedBody { .. }
            | SolveError::InvalidImage => "client_input",
            SolveError::MissingApiKey => "server_config",
            SolveError::UpstreamAuth => "upstream_auth",
            SolveError::UpstreamRateLimit => "upstream_rate_limit",
            SolveError::UpstreamUnavailable => "upstream_unavailable",
            SolveError::UpstreamUnknown(_) => "upstream_unknown",
            SolveError::Unexpected => "unexpected",
        }
    }
}

fn classify_message(message: String) -> SolveError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["api key", "authentication"]) {
        SolveError::UpstreamAuth
    } else if has(&["quota", "rate limit"]) {
        SolveError::UpstreamRateLimit
    } else if has(&["connection", "network"]) {
        SolveError::UpstreamUnavailable
    } else {
        SolveError::UpstreamUnknown(message)
    }
}

impl IntoResponse for SolveError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorDetail::new(self.to_string()))).into_response()
    }
}
