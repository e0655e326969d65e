use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnswerModel, ImageInput, UpstreamError, SYSTEM_PROMPT, USER_PROMPT};
use crate::config::Config;

/// Gemini `generateContent` client for the tutoring prompt.
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiMessage>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiMessage {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            api_key: config.gemini_api_key.clone().unwrap_or_default(),
            api_base: config.gemini_api_base.clone(),
            model: config.model_name.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client: reqwest::Client::builder()
                .user_agent(concat!("vibemath/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("Build Gemini HTTP client")?,
        })
    }

    fn build_request(&self, image: &ImageInput) -> GeminiRequest {
        GeminiRequest {
            system_instruction: GeminiContent {
                parts: vec![GeminiPart::Text {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
            contents: vec![GeminiMessage {
                role: "user".to_string(),
                parts: vec![
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: STANDARD.encode(&image.bytes),
                        },
                    },
                    GeminiPart::Text {
                        text: USER_PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl AnswerModel for GeminiClient {
    async fn generate_answer(&self, image: &ImageInput) -> Result<String, UpstreamError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );

        debug!(
            model = %self.model,
            mime_type = %image.mime_type,
            image_bytes = image.bytes.len(),
            "Sending image to Gemini"
        );

        let resp = self
            .client
            .post(&url)
            .json(&self.build_request(image))
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let data: GeminiResponse = resp.json().await.map_err(|e| {
            if e.is_body() {
                return transport_error(e);
            }
            UpstreamError::Other(format!("Failed to parse Gemini response: {}", e.without_url()))
        })?;

        if let Some(usage) = &data.usage_metadata {
            debug!(
                "Gemini: {} tokens in, {} tokens out",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        let candidate = data.candidates.and_then(|c| c.into_iter().next());
        if let Some(reason) = candidate.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            debug!("Gemini finish reason: {reason}");
        }

        let text = candidate
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}

/// Map a transport failure. Anything that broke the exchange on the wire
/// (refused, reset, closed mid-response, timed out) is a connectivity failure.
/// The URL carries the key, so it is stripped from the message.
fn transport_error(e: reqwest::Error) -> UpstreamError {
    let unavailable = e.is_connect() || e.is_timeout() || e.is_request() || e.is_body();
    let message = error_chain(&e.without_url());
    if unavailable {
        UpstreamError::Unavailable(format!("connection failed: {message}"))
    } else {
        UpstreamError::Other(message)
    }
}

/// `outer: inner: root` so the underlying cause reaches the logs and classifier.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Map a non-success Gemini response to a typed upstream error.
fn classify_status(status: StatusCode, body: &str) -> UpstreamError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    let message = match &parsed {
        Some(err) if !err.message.is_empty() => err.message.clone(),
        _ => body.chars().take(300).collect(),
    };
    let api_status = parsed.as_ref().map(|e| e.status.as_str()).unwrap_or("");
    let key_invalid = parsed
        .as_ref()
        .map(|e| {
            e.details
                .iter()
                .any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
        })
        .unwrap_or(false);

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
        return UpstreamError::RateLimited(message);
    }

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || api_status == "UNAUTHENTICATED"
        || api_status == "PERMISSION_DENIED"
        || key_invalid
        || message.to_lowercase().contains("api key")
    {
        return UpstreamError::InvalidCredentials(message);
    }

    if matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    ) || api_status == "UNAVAILABLE"
    {
        return UpstreamError::Unavailable(message);
    }

    UpstreamError::Other(format!("Gemini API {status}: {message}"))
}
