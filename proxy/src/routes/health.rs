use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub timestamp: String,
    pub version: String,
    pub api_key_set: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    /// Status derived from whether the upstream credential is configured.
    pub fn probe(api_key_set: bool) -> Self {
        let (status, message) = if api_key_set {
            (
                HealthState::Healthy,
                "API is healthy and ready to process requests",
            )
        } else {
            (
                HealthState::Degraded,
                "API is in degraded state - GEMINI_API_KEY environment variable is not configured",
            )
        };

        Self {
            status,
            timestamp: now_iso8601(),
            version: VERSION.to_string(),
            api_key_set,
            message: message.to_string(),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            timestamp: now_iso8601(),
            version: VERSION.to_string(),
            api_key_set: false,
            message: "An unexpected error occurred during health check".to_string(),
            error: Some(error.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            HealthState::Healthy => StatusCode::OK,
            HealthState::Degraded => StatusCode::SERVICE_UNAVAILABLE,
            HealthState::Unhealthy => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Millisecond-precision UTC timestamp, e.g. `2024-05-01T12:00:00.000Z`.
fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// GET /health
///
/// 200 when the upstream credential is configured, 503 (degraded) otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let status = HealthStatus::probe(state.config.api_key_set());
    debug!("Health check: {:?}", status.status);
    (status.status_code(), Json(status))
}
