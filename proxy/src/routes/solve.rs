use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::analyzer::{ImageInput, UpstreamError};
use crate::error::SolveError;
use crate::image::{decode_image_payload, upload_mime_type};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub answer: String,
}

/// POST /solve
///
/// Body `{"image": "<base64 or data URI>"}`. Returns `{"answer": ..}` or `{"detail": ..}`.
pub async fn solve(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let outcome = match parse_json_image(body) {
        Ok(image) => answer(&state, image).await,
        Err(e) => Err(e),
    };
    respond(outcome)
}

/// POST /solve/upload
///
/// Multipart form with the problem image in the `file` field.
pub async fn solve_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let outcome = match read_upload(multipart).await {
        Ok(image) => answer(&state, image).await,
        Err(e) => Err(e),
    };
    respond(outcome)
}

fn respond(outcome: Result<String, SolveError>) -> Response {
    match outcome {
        Ok(answer) => (StatusCode::OK, Json(SolveResponse { answer })).into_response(),
        Err(e) => {
            warn!(kind = e.kind(), status = e.status().as_u16(), "Solve failed: {e}");
            e.into_response()
        }
    }
}

fn parse_json_image(body: Result<Bytes, BytesRejection>) -> Result<ImageInput, SolveError> {
    let bytes = body.map_err(|rejection| SolveError::MalformedBody {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|_| SolveError::MalformedBody {
        status: StatusCode::BAD_REQUEST,
        message: "Request body must be valid JSON".to_string(),
    })?;

    // serde would also accept the sequence form `["..."]` of the struct.
    if !value.is_object() {
        return Err(SolveError::MissingImage);
    }
    let request: SolveRequest =
        serde_json::from_value(value).map_err(|_| SolveError::MissingImage)?;
    if request.image.is_empty() {
        return Err(SolveError::MissingImage);
    }

    decode_image_payload(&request.image).ok_or(SolveError::InvalidImage)
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ImageInput, SolveError> {
    let mut multipart = multipart.map_err(|rejection| SolveError::MalformedBody {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let malformed = |e: axum::extract::multipart::MultipartError| SolveError::MalformedBody {
        status: e.status(),
        message: e.body_text(),
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("file") {
            continue;
        }

        let mime_type = upload_mime_type(field.content_type());
        let bytes = field.bytes().await.map_err(malformed)?;
        if bytes.is_empty() {
            return Err(SolveError::MissingFile);
        }

        return Ok(ImageInput {
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(SolveError::MissingFile)
}

/// Shared tail of both solve routes: credential check, upstream call, output shaping.
pub async fn answer(state: &AppState, image: ImageInput) -> Result<String, SolveError> {
    if !state.config.api_key_set() {
        return Err(SolveError::MissingApiKey);
    }

    let raw = state
        .model
        .generate_answer(&image)
        .await
        .map_err(SolveError::from_upstream)?;

    let answer = raw.trim();
    if answer.is_empty() {
        return Err(SolveError::from_upstream(UpstreamError::EmptyResponse));
    }

    info!(
        "Solved {} image ({} bytes, {} chars out)",
        image.mime_type,
        image.bytes.len(),
        answer.len()
    );
    Ok(answer.to_string())
}
