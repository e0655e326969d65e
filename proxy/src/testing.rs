//! Shared helpers for router tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crate::analyzer::{AnswerModel, ImageInput, UpstreamError};
use crate::config::Config;
use crate::{build_router, AppState};

/// Canned `AnswerModel` that records every call.
#[derive(Clone)]
pub struct FakeModel {
    reply: Result<String, UpstreamError>,
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<ImageInput>>>,
}

impl FakeModel {
    pub fn answering(text: &str) -> Self {
        Self::with_reply(Ok(text.to_string()))
    }

    pub fn failing(err: UpstreamError) -> Self {
        Self::with_reply(Err(err))
    }

    fn with_reply(reply: Result<String, UpstreamError>) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_image(&self) -> Option<ImageInput> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerModel for FakeModel {
    async fn generate_answer(&self, image: &ImageInput) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(image.clone());
        self.reply.clone()
    }
}

pub fn app_with(api_key: Option<&str>, model: FakeModel) -> Router {
    let key = api_key.map(str::to_string);
    let config = Config::from_lookup(|k| match k {
        "GEMINI_API_KEY" => key.clone(),
        _ => None,
    })
    .unwrap();

    build_router(AppState {
        config: Arc::new(config),
        model: Arc::new(model),
    })
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn post_json(app: Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}
