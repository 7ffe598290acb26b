use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Post record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub analysis: Option<String>, // generated for ingested articles only
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Post joined with the name of its category.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostWithCategory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: Post,
    pub category_name: Option<String>,
}

/// Editable fields of a post, as written by the admin surface.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    pub published: bool,
}

/// Article produced by ingestion, always stored as published.
#[derive(Debug, Clone)]
pub struct IngestedPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub published_at: OffsetDateTime,
    pub analysis: String,
}

/// Slice of published posts plus the total count matching the filter.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<PostWithCategory>,
    pub total: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SitemapRow {
    pub id: i64,
    pub updated_at: OffsetDateTime,
}
