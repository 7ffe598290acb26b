use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::PostWithCategory;

/// Query string of `GET /api/posts`; numbers are parsed by the handler so
/// malformed values get a JSON error.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_posts: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostWithCategory>,
    pub pagination: PaginationMeta,
}

/// SEO metadata derived for a single post page.
#[derive(Debug, Serialize)]
pub struct PostMeta {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub section: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_time: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostWithCategory,
    pub meta: PostMeta,
}

/// Body of admin create/update.
#[derive(Debug, Deserialize)]
pub struct PostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub published: bool,
}
