use anyhow::{Context, Result};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream credential. `None` puts the service in degraded mode.
    pub gemini_api_key: Option<String>,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub gemini_api_base: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Allowed CORS origins; `["*"]` means any origin.
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Config {
    /// Load `.env` if present, then read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (used directly by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            gemini_api_key: lookup("GEMINI_API_KEY")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            model_name: env("MODEL_NAME", "gemini-1.5-flash"),
            max_tokens: env("MAX_TOKENS", "500")
                .parse()
                .context("MAX_TOKENS must be a valid u32")?,
            temperature: env("TEMPERATURE", "0.2")
                .parse()
                .context("TEMPERATURE must be a valid number")?,
            gemini_api_base: env("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            host: env("HOST", "0.0.0.0"),
            port: env("PORT", "8000")
                .parse()
                .context("PORT must be a valid u16")?,
            log_level: env("LOG_LEVEL", "info").to_lowercase(),
            cors_origins: parse_origins(&env("CORS_ORIGINS", "*")),
            max_body_bytes: env("MAX_BODY_BYTES", "10485760")
                .parse()
                .context("MAX_BODY_BYTES must be a valid usize")?,
        })
    }

    pub fn api_key_set(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}
