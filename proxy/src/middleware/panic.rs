use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::error::SolveError;
use crate::routes::health::HealthStatus;

/// Panic response for the solve routes: the generic 500 `{detail}` body.
pub fn solve_panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    error!("Panic while solving: {}", panic_message(err.as_ref()));
    SolveError::Unexpected.into_response()
}

/// Panic response for the health route: an `unhealthy` status carrying the panic message.
pub fn health_panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(err.as_ref());
    error!("Panic in health check: {message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(HealthStatus::unhealthy(message)),
    )
        .into_response()
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}
