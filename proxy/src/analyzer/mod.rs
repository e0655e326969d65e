pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

/// Tutoring instruction sent with every image.
pub const SYSTEM_PROMPT: &str = concat!(
    "You are an expert science and math tutor who provides clear, thoughtful, and brief explanations. Given an image of a problem, ",
    "Your response must strictly follow this format: 'Answer: [Your final numerical or symbolic answer]\nExplanation: [A concise 1-2 sentence explanation of the solution steps or concept].' ",
    "If the problem is unclear or cannot be solved from the image, state 'Cannot solve: [reason]' instead of an answer."
);

/// User turn text that follows the image.
pub const USER_PROMPT: &str = "Solve this.";

/// A decoded image ready to forward upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Failure reported by the upstream model service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Invalid API key: {0}")]
    InvalidCredentials(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("No response from AI model")]
    EmptyResponse,

    /// Untyped failure; classified later by message inspection.
    #[error("{0}")]
    Other(String),
}

/// Capability to turn a problem image into a tutoring answer.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    /// Returns the raw model output (untrimmed).
    async fn generate_answer(&self, image: &ImageInput) -> Result<String, UpstreamError>;
}
