pub mod health;
pub mod solve;

use axum::http::StatusCode;
use axum::Json;

use crate::error::ErrorDetail;

/// OPTIONS that reach a handler (non-CORS clients) get an empty 200.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> (StatusCode, Json<ErrorDetail>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorDetail::new("Method not allowed")),
    )
}

pub async fn not_found() -> (StatusCode, Json<ErrorDetail>) {
    (StatusCode::NOT_FOUND, Json(ErrorDetail::new("Not Found")))
}
