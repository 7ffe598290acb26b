use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::NewsApiConfig;

/// One candidate article as delivered by the headline feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    /// RFC 3339 timestamp; parsed by the ingestion routine.
    pub published_at: Option<String>,
}

/// Body of a NewsAPI reply, discriminated by its `status` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NewsApiResponse {
    Ok { articles: Vec<FeedArticle> },
    Error {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("news feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid news data.")]
    Invalid(#[source] serde_json::Error),

    #[error("news feed rejected the request: {0}")]
    Rejected(String),
}

impl NewsApiResponse {
    pub fn into_articles(self) -> Result<Vec<FeedArticle>, FeedError> {
        match self {
            NewsApiResponse::Ok { articles } => Ok(articles),
            NewsApiResponse::Error { code, message } => Err(FeedError::Rejected(
                message
                    .or(code)
                    .unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }
}

/// Source of candidate articles for ingestion.
#[async_trait]
pub trait HeadlineFeed: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedArticle>, FeedError>;
}

#[derive(Clone)]
pub struct NewsApiClient {
    http: reqwest::Client,
    cfg: NewsApiConfig,
}

impl NewsApiClient {
    pub fn new(http: reqwest::Client, cfg: NewsApiConfig) -> Self {
        Self { http, cfg }
    }
}

#[async_trait]
impl HeadlineFeed for NewsApiClient {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<FeedArticle>, FeedError> {
        let res = self
            .http
            .get(&self.cfg.url)
            .query(&[
                ("country", self.cfg.country.as_str()),
                ("category", self.cfg.category.as_str()),
                ("apiKey", self.cfg.api_key.as_str()),
            ])
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        debug!(%status, country = %self.cfg.country, category = %self.cfg.category, bytes = body.len(), "news feed response");

        let parsed: NewsApiResponse = serde_json::from_str(&body).map_err(FeedError::Invalid)?;
        parsed.into_articles()
    }
}
