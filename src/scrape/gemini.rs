use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GeminiConfig;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error("unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Body of a `generateContent` reply: either an error object or candidates.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GeminiResponse {
    Failure {
        error: GeminiApiError,
    },
    Success {
        #[serde(default)]
        candidates: Vec<Candidate>,
    },
}

#[derive(Debug, Deserialize)]
pub struct GeminiApiError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate.
    pub fn into_text(self) -> Result<Option<String>, GenerationError> {
        match self {
            GeminiResponse::Failure { error } => Err(GenerationError::Api(
                error
                    .message
                    .or(error.status)
                    .unwrap_or_else(|| format!("error code {}", error.code.unwrap_or_default())),
            )),
            GeminiResponse::Success { candidates } => Ok(candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|c| c.parts.into_iter().next())
                .and_then(|p| p.text)
                .filter(|t| !t.trim().is_empty())),
        }
    }
}

/// Generative-text backend used for article analysis.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// `Ok(None)` when the model answered without any text.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    cfg: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, cfg: GeminiConfig) -> Self {
        Self { http, cfg }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.cfg.url, self.cfg.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip_all)]
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError> {
        let res = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.cfg.api_key.as_str())])
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        debug!(%status, model = %self.cfg.model, bytes = body.len(), "generation response");

        let parsed: GeminiResponse = serde_json::from_str(&body)?;
        parsed.into_text()
    }
}
